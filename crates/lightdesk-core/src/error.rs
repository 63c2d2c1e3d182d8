// ── Core error types ──
//
// User-facing errors from lightdesk-core. Consumers never see reqwest or
// serde errors directly: the `From<lightdesk_api::Error>` impl translates
// transport-layer failures into domain variants. Socket failures are not
// errors at this level at all; the connection retries them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach lighting backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Lighting backend did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Lighting connection is closed")]
    Disconnected,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Command not delivered: {command} (socket not open)")]
    NotDelivered { command: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lightdesk_api::Error> for CoreError {
    fn from(err: lightdesk_api::Error) -> Self {
        match err {
            lightdesk_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            lightdesk_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            lightdesk_api::Error::Tls(message) => CoreError::Config {
                message: format!("TLS setup failed: {message}"),
            },
            lightdesk_api::Error::Http { status, url, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status} from {url}")
                } else {
                    format!("HTTP {status} from {url}: {body}")
                },
                status: Some(status),
            },
            lightdesk_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: "<websocket>".into(),
                reason,
            },
            lightdesk_api::Error::Deserialization { message, .. } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_keeps_status() {
        let err = CoreError::from(lightdesk_api::Error::Http {
            status: 502,
            url: "http://desk/rest/script/list".into(),
            body: "bad gateway".into(),
        });
        match err {
            CoreError::Api { status, message } => {
                assert_eq!(status, Some(502));
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn refused_socket_is_connection_failure() {
        let err = CoreError::from(lightdesk_api::Error::WebSocketConnect("refused".into()));
        assert!(matches!(err, CoreError::ConnectionFailed { ref reason, .. } if reason == "refused"));
    }

    #[test]
    fn bad_body_is_api_error() {
        let err = CoreError::from(lightdesk_api::Error::Deserialization {
            message: "missing field `scripts`".into(),
            body: "{}".into(),
        });
        assert!(err.to_string().contains("missing field"));
    }
}
