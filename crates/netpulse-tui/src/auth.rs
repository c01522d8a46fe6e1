//! Background session tasks: token restore, login and logout.
//!
//! Each task drives a fresh [`Authenticator`] and reports back with
//! actions; nothing here touches UI state directly.

use secrecy::SecretString;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use netpulse_core::{Authenticator, LoginForm, Monitor, MonitorConfig, SessionState};

use crate::action::Action;

fn authenticator(base: &MonitorConfig) -> Result<Authenticator, Action> {
    base.client().map(Authenticator::new).map_err(|e| Action::AuthFailed {
        state: SessionState::Anonymous,
        message: e.to_string(),
        rejected: false,
    })
}

/// Check a persisted token before showing the dashboard.
pub fn spawn_restore(
    base: MonitorConfig,
    token: SecretString,
    email: Option<String>,
    tx: UnboundedSender<Action>,
) {
    let _ = tx.send(Action::SessionChanged(SessionState::Authenticating));
    tokio::spawn(async move {
        let mut auth = match authenticator(&base) {
            Ok(auth) => auth,
            Err(action) => {
                let _ = tx.send(action);
                return;
            }
        };
        let action = match auth.restore(token.clone()).await {
            Ok(_) => Action::Authenticated {
                token,
                email,
                fresh: false,
            },
            Err(e) => Action::AuthFailed {
                state: auth.state(),
                rejected: e.is_auth_expired(),
                message: e.to_string(),
            },
        };
        let _ = tx.send(action);
    });
}

/// Submit an already-validated login form.
pub fn spawn_login(base: MonitorConfig, form: LoginForm, tx: UnboundedSender<Action>) {
    let _ = tx.send(Action::SessionChanged(SessionState::Authenticating));
    tokio::spawn(async move {
        let mut auth = match authenticator(&base) {
            Ok(auth) => auth,
            Err(action) => {
                let _ = tx.send(action);
                return;
            }
        };
        let action = match auth.login(&form).await {
            Ok(token) => {
                info!(email = %form.email, "login accepted");
                Action::Authenticated {
                    token,
                    email: Some(form.email.trim().to_owned()),
                    fresh: true,
                }
            }
            Err(e) => Action::AuthFailed {
                state: auth.state(),
                rejected: false,
                message: e.to_string(),
            },
        };
        let _ = tx.send(action);
    });
}

/// Revoke the monitor's token server-side. Failures are only logged.
pub fn spawn_logout(monitor: &Monitor) {
    let client = monitor.client().clone();
    tokio::spawn(async move {
        if let Err(e) = client.logout().await {
            warn!(error = %e, "server-side logout failed (non-fatal)");
        }
    });
}
