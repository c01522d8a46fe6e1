//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use netpulse_config::ConfigError;
use netpulse_core::{CoreError, ValidationErrors};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to backend at {url}")]
    #[diagnostic(
        code(netpulse::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Override the URL with --api-url or NETPULSE_API_URL."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Live stream failed: {reason}")]
    #[diagnostic(code(netpulse::stream))]
    Stream { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(netpulse::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netpulse::auth_failed),
        help("Check your email and password, or reset it with: netpulse reset-password")
    )]
    AuthFailed { message: String },

    #[error("Not logged in (profile '{profile}')")]
    #[diagnostic(
        code(netpulse::not_logged_in),
        help("Run: netpulse login\nOr pass a token with --token / NETPULSE_TOKEN.")
    )]
    NotLoggedIn { profile: String },

    #[error("Session expired for profile '{profile}'")]
    #[diagnostic(
        code(netpulse::session_expired),
        help("The stored token was removed. Run: netpulse login")
    )]
    SessionExpired { profile: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(netpulse::invalid_input), help("Fix the fields above and try again."))]
    InvalidInput(ValidationErrors),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netpulse::validation))]
    Validation { field: String, reason: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    #[diagnostic(code(netpulse::api_error))]
    Api { message: String, status: Option<u16> },

    #[error("Unexpected response from backend: {message}")]
    #[diagnostic(
        code(netpulse::invalid_response),
        help("Check that --api-url points at a netpulse backend.")
    )]
    InvalidResponse { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(netpulse::config),
        help("Inspect the file with: netpulse config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(netpulse::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(netpulse::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Prompt failed: {0}")]
    #[diagnostic(
        code(netpulse::prompt),
        help("Pass the value as a flag or use --password-stdin when not on a terminal.")
    )]
    Prompt(#[from] dialoguer::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Stream { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn { .. } | Self::SessionExpired { .. } => {
                exit_code::AUTH
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::InvalidInput(_) | Self::Validation { .. } => exit_code::USAGE,
            Self::Config(ConfigError::Validation { .. } | ConfigError::UnknownKey { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Convert a core error raised while acting for `profile`.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::NotAuthenticated => Self::NotLoggedIn {
                profile: profile.into(),
            },
            CoreError::SessionExpired { .. } => Self::SessionExpired {
                profile: profile.into(),
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Stream { reason } => Self::Stream { reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::SessionExpired { .. } => Self::SessionExpired {
                profile: "current".into(),
            },
            CoreError::NotAuthenticated => Self::NotLoggedIn {
                profile: "current".into(),
            },
            CoreError::Validation(errors) => Self::InvalidInput(errors),
            CoreError::Api { message, status } => Self::Api { message, status },
            CoreError::InvalidResponse { message } => Self::InvalidResponse { message },
            CoreError::InvalidTransition { from, event } => Self::Validation {
                field: "session".into(),
                reason: format!("cannot apply {event} while {from}"),
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
