//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use secrecy::SecretString;

use netpulse_core::{AlertStore, AnomalyId, ConnectionState, LoginForm, SessionState, ViewModel};

use crate::screen::ScreenId;

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    GoBack,

    // ── Data events (from the monitor) ────────────────────────────
    ViewUpdated(Arc<ViewModel>),
    AlertsUpdated(Arc<AlertStore>),
    ConnectionChanged(ConnectionState),

    // ── Session ───────────────────────────────────────────────────
    SessionChanged(SessionState),
    SubmitLogin(LoginForm),
    /// A token was accepted. `fresh` tokens come from a login and are
    /// persisted; restored ones already are.
    Authenticated {
        token: SecretString,
        email: Option<String>,
        fresh: bool,
    },
    /// Login or token check failed. `rejected` is set when the backend
    /// refused the credential itself rather than being unreachable.
    AuthFailed {
        state: SessionState,
        message: String,
        rejected: bool,
    },
    SessionExpired(String),
    Logout,

    // ── Alerts ────────────────────────────────────────────────────
    AcknowledgeAlert(AnomalyId),

    // ── Search ────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    SearchInput(String),
    SearchSubmit,

    // ── Help ──────────────────────────────────────────────────────
    ToggleHelp,
}
