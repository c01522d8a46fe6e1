use thiserror::Error;

/// Top-level error type for the `netpulse-api` crate.
///
/// Covers every failure mode across the REST endpoints and the Socket.IO
/// stream. `netpulse-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login, signup or reset rejected by the auth service.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Bearer token was rejected (expired, revoked or malformed).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// Operation requires a bearer token but the client has none.
    #[error("No session token -- log in first")]
    MissingToken,

    /// Token cannot be used as an HTTP header value.
    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST API ────────────────────────────────────────────────────
    /// Non-success status from a network endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Stream ──────────────────────────────────────────────────────
    /// WebSocket upgrade or Socket.IO handshake failed.
    #[error("Stream connection failed: {0}")]
    WebSocketConnect(String),

    /// Server refused the Socket.IO CONNECT (bad or missing token).
    #[error("Stream rejected by server: {message}")]
    StreamRejected { message: String },

    /// WebSocket closed unexpectedly.
    #[error("Stream closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Server stopped answering within the negotiated ping window.
    #[error("Stream heartbeat timed out after {timeout_ms}ms")]
    HeartbeatTimeout { timeout_ms: u64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the stored credential is no
    /// longer usable and the user has to log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired
                | Self::MissingToken
                | Self::InvalidToken(_)
                | Self::StreamRejected { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. }
            | Self::WebSocketConnect(_)
            | Self::WebSocketClosed { .. }
            | Self::HeartbeatTimeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_classification() {
        assert!(Error::SessionExpired.is_auth_expired());
        assert!(
            Error::StreamRejected {
                message: "unauthorized".into()
            }
            .is_auth_expired()
        );
        assert!(
            !Error::Authentication {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(503));

        let err = Error::Api {
            status: 404,
            message: "missing".into(),
        };
        assert!(!err.is_transient());
    }
}
