// ── Core error types ──
//
// User-facing errors from netpulse-core. Consumers never match on HTTP
// status codes or socket frames: `From<netpulse_api::Error>` folds the
// transport errors into the handful of cases a dashboard reacts to.

use thiserror::Error;

use crate::session::SessionState;
use crate::validation::ValidationErrors;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Live stream failed: {reason}")]
    Stream { reason: String },

    // ── Authentication errors ────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The stored credential is no longer accepted. The caller must clear
    /// it and ask the user to log in again.
    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Cannot apply {event} while session is {from}")]
    InvalidTransition {
        from: SessionState,
        event: &'static str,
    },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    // ── Backend errors ───────────────────────────────────────────────
    #[error("Backend error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Unexpected response from backend: {message}")]
    InvalidResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` when the user has to log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::NotAuthenticated)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netpulse_api::Error> for CoreError {
    fn from(err: netpulse_api::Error) -> Self {
        use netpulse_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionExpired => Self::SessionExpired {
                message: "the backend rejected the session token".into(),
            },
            Api::MissingToken => Self::NotAuthenticated,
            Api::InvalidToken(reason) => Self::SessionExpired {
                message: format!("stored token is unusable: {reason}"),
            },
            Api::StreamRejected { message } => Self::SessionExpired { message },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    Self::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            Api::Tls(msg) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => Self::Stream { reason },
            Api::WebSocketClosed { code, reason } => Self::Stream {
                reason: format!("closed (code {code}): {reason}"),
            },
            Api::HeartbeatTimeout { timeout_ms } => Self::Stream {
                reason: format!("no heartbeat for {timeout_ms}ms"),
            },
            Api::Deserialization { message, body: _ } => Self::InvalidResponse { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_credentials_map_to_session_expired() {
        let core = CoreError::from(netpulse_api::Error::SessionExpired);
        assert!(core.is_auth_expired());

        let core = CoreError::from(netpulse_api::Error::StreamRejected {
            message: "invalid token".into(),
        });
        assert!(core.is_auth_expired());
        assert_eq!(core.to_string(), "Session expired: invalid token");
    }

    #[test]
    fn api_status_is_preserved() {
        let core = CoreError::from(netpulse_api::Error::Api {
            status: 503,
            message: "maintenance".into(),
        });
        assert!(matches!(core, CoreError::Api { status: Some(503), .. }));
        assert!(!core.is_auth_expired());
    }
}
