//! Universe listing.

use serde::Serialize;
use tabled::Tabled;

use lightdesk_core::LightingDesk;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(transparent)]
struct Universe(u16);

#[derive(Tabled)]
struct UniverseRow {
    #[tabled(rename = "Universe")]
    universe: u16,
}

pub async fn handle(desk: &LightingDesk, global: &GlobalOpts) -> Result<(), CliError> {
    let mut changes = desk.universes().watch();

    util::wait_open(desk).await?;
    let timeout = desk.config().timeout;
    match tokio::time::timeout(timeout, changes.changed()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => return Err(CliError::Disconnected),
        Err(_) => {
            return Err(CliError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
    }

    let universes: Vec<Universe> = desk.universes().get_all().iter().copied().map(Universe).collect();
    let out = output::render_list(
        &global.output,
        &universes,
        |u| UniverseRow { universe: u.0 },
        |u| u.0.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
