// ── Runtime desk configuration ──
//
// Describes *how* to talk to a lighting backend. The CLI builds a
// `DeskConfig` (usually from a config-file profile) and hands it in;
// core never reads files.

use std::time::Duration;

use lightdesk_api::{ConnectionConfig, ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;

/// Configuration for one lighting backend.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// REST base URL (e.g., `http://desk.local:8080/`).
    pub base_url: Url,
    /// WebSocket endpoint. Derived from `base_url` when `None`.
    pub ws_url: Option<Url>,
    pub reconnect: ReconnectConfig,
    /// Keep-alive ping period.
    pub ping_interval: Duration,
    /// Window over which channel level pushes are coalesced.
    pub channel_debounce: Duration,
    /// REST request timeout.
    pub timeout: Duration,
    pub tls: TlsMode,
}

impl DeskConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ws_url: None,
            reconnect: ReconnectConfig::default(),
            ping_interval: Duration::from_secs(10),
            channel_debounce: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            tls: TlsMode::default(),
        }
    }

    /// Connection settings for the WebSocket.
    pub fn connection_config(&self) -> Result<ConnectionConfig, CoreError> {
        let mut config = ConnectionConfig::from_base_url(self.base_url.clone())?;
        if let Some(ws_url) = &self.ws_url {
            if !matches!(ws_url.scheme(), "ws" | "wss") {
                return Err(CoreError::Config {
                    message: format!("WebSocket URL must use ws:// or wss://, got {ws_url}"),
                });
            }
            config.ws_url = ws_url.clone();
        }
        if self.ping_interval.is_zero() {
            return Err(CoreError::Config {
                message: "ping interval must be non-zero".into(),
            });
        }
        if self.reconnect.initial_delay.is_zero() {
            return Err(CoreError::Config {
                message: "initial reconnect delay must be non-zero".into(),
            });
        }
        config.reconnect = self.reconnect.clone();
        config.ping_interval = self.ping_interval;
        Ok(config)
    }

    /// Settings for the REST client.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DeskConfig::new(Url::parse("http://desk.local:8080/").unwrap());
        assert_eq!(config.channel_debounce, Duration::from_millis(100));
        assert_eq!(config.ping_interval, Duration::from_secs(10));

        let conn = config.connection_config().unwrap();
        assert_eq!(conn.ws_url.as_str(), "ws://desk.local:8080/lighting/");
        assert_eq!(conn.reconnect, ReconnectConfig::default());
    }

    #[test]
    fn explicit_ws_url_wins() {
        let mut config = DeskConfig::new(Url::parse("https://desk.example/").unwrap());
        config.ws_url = Some(Url::parse("wss://relay.example/sock").unwrap());
        config.ping_interval = Duration::from_secs(3);

        let conn = config.connection_config().unwrap();
        assert_eq!(conn.ws_url.as_str(), "wss://relay.example/sock");
        assert_eq!(conn.ping_interval, Duration::from_secs(3));
    }

    #[test]
    fn rejects_http_ws_url() {
        let mut config = DeskConfig::new(Url::parse("http://desk/").unwrap());
        config.ws_url = Some(Url::parse("http://desk/lighting/").unwrap());
        assert!(matches!(config.connection_config(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn rejects_zero_periods() {
        let mut config = DeskConfig::new(Url::parse("http://desk/").unwrap());
        config.ping_interval = Duration::ZERO;
        assert!(matches!(config.connection_config(), Err(CoreError::Config { .. })));

        let mut config = DeskConfig::new(Url::parse("http://desk/").unwrap());
        config.reconnect.initial_delay = Duration::ZERO;
        assert!(matches!(config.connection_config(), Err(CoreError::Config { .. })));
    }
}
