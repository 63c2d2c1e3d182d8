//! Shared helpers for command handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lightdesk_core::LightingDesk;
use tokio::sync::Notify;

use crate::error::CliError;

/// Connect-and-wait: resolve once the socket is open, within the
/// configured timeout.
pub async fn wait_open(desk: &LightingDesk) -> Result<(), CliError> {
    let timeout = desk.config().timeout;
    desk.wait_until_open(timeout).await?;
    tracing::debug!(ws_url = %desk.connection().ws_url(), "socket open");
    Ok(())
}

/// Fires once the backend pushes, ignoring the snapshot that adapters
/// deliver synchronously on subscribe.
#[derive(Clone, Default)]
pub struct PushSignal {
    notify: Arc<Notify>,
    primed: Arc<AtomicBool>,
}

impl PushSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call from a subscriber callback.
    pub fn trigger(&self) {
        if self.primed.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// `true` if a push arrived within `timeout`.
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.notify.notified())
            .await
            .is_ok()
    }
}

/// Block until Ctrl-C.
pub async fn until_interrupted() -> Result<(), CliError> {
    tokio::signal::ctrl_c().await?;
    tracing::debug!("interrupted");
    Ok(())
}
