//! Data bridge: forwards [`Monitor`] watch channels into TUI actions.
//!
//! Runs as a background task for the lifetime of one authenticated
//! session. The monitor itself is connected by the app, which owns the
//! [`Subscription`](netpulse_core::Subscription).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use netpulse_core::Monitor;

use crate::action::Action;

pub async fn spawn_data_bridge(
    monitor: Monitor,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut views = monitor.subscribe_view();
    let mut alerts = monitor.subscribe_alerts();
    let mut connection = monitor.subscribe_connection();

    // Initial values so screens render whatever is already known.
    let _ = action_tx.send(Action::ViewUpdated(views.current().clone()));
    let _ = action_tx.send(Action::AlertsUpdated(alerts.current().clone()));
    let _ = action_tx.send(Action::ConnectionChanged(
        connection.borrow_and_update().clone(),
    ));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = connection.changed() => {
                let state = connection.borrow_and_update().clone();
                debug!(connected = state.is_connected, "dispatching ConnectionChanged");
                if state.auth_expired {
                    let reason = state
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "session expired".into());
                    let _ = action_tx.send(Action::ConnectionChanged(state));
                    let _ = action_tx.send(Action::SessionExpired(reason));
                    break;
                }
                let _ = action_tx.send(Action::ConnectionChanged(state));
            }
            Some(view) = views.changed() => {
                let _ = action_tx.send(Action::ViewUpdated(view));
            }
            Some(store) = alerts.changed() => {
                let _ = action_tx.send(Action::AlertsUpdated(store));
            }
            else => break,
        }
    }

    debug!("data bridge shut down");
}
