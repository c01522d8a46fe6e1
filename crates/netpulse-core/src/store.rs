// ── Dashboard state store ──
//
// Holds the current view model, the alert store and the connection state,
// each behind a `watch` channel so readers get cheap `Arc` snapshots and
// change notification. All mutation goes through the methods here.

use std::sync::Arc;

use netpulse_api::StreamStatus;
use tokio::sync::watch;
use tracing::debug;

use crate::alerts::AlertStore;
use crate::model::{Anomaly, AnomalyId, ConnectionState, ViewModel};
use crate::reducer::{self, Delta, Snapshot};
use crate::stream::ViewStream;

/// Inputs that `ConnectionState` is derived from.
#[derive(Debug, Clone, Default)]
struct Health {
    snapshot_ok: bool,
    snapshot_error: Option<String>,
    stream_error: Option<String>,
    auth_expired: bool,
}

impl Health {
    fn connection(&self) -> ConnectionState {
        ConnectionState {
            is_connected: self.snapshot_ok && self.stream_error.is_none(),
            last_error: self
                .stream_error
                .clone()
                .or_else(|| self.snapshot_error.clone()),
            auth_expired: self.auth_expired,
        }
    }
}

pub struct DashboardStore {
    view: watch::Sender<Arc<ViewModel>>,
    alerts: watch::Sender<Arc<AlertStore>>,
    health: watch::Sender<Health>,
    connection: watch::Sender<ConnectionState>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        let (view, _) = watch::channel(Arc::new(ViewModel::default()));
        let (alerts, _) = watch::channel(Arc::new(AlertStore::new()));
        let (health, _) = watch::channel(Health::default());
        let (connection, _) = watch::channel(ConnectionState::default());
        Self {
            view,
            alerts,
            health,
            connection,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn view(&self) -> Arc<ViewModel> {
        self.view.borrow().clone()
    }

    pub fn alerts(&self) -> Arc<AlertStore> {
        self.alerts.borrow().clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection.borrow().clone()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_view(&self) -> ViewStream<ViewModel> {
        ViewStream::new(self.view.subscribe())
    }

    pub fn subscribe_alerts(&self) -> ViewStream<AlertStore> {
        ViewStream::new(self.alerts.subscribe())
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    // ── Data mutations ───────────────────────────────────────────────

    /// Replace the whole view with a snapshot and derive alerts for its
    /// anomalies. Existing alerts, and their acknowledged flags, are kept.
    pub fn apply_snapshot(&self, snapshot: Snapshot) {
        let view = reducer::replace(snapshot);
        let added = self.ingest_alerts(&view.anomalies);
        debug!(
            devices = view.devices.len(),
            traffic = view.traffic.len(),
            anomalies = view.anomalies.len(),
            new_alerts = added,
            "snapshot applied"
        );
        self.view.send_replace(Arc::new(view));
        self.update_health(|h| {
            h.snapshot_ok = true;
            h.snapshot_error = None;
        });
    }

    /// Merge a stream delta into the current view. Only anomalies the view
    /// accepted are offered to the alert store.
    pub fn apply_delta(&self, delta: &Delta) {
        if delta.is_empty() {
            return;
        }
        let mut accepted = Vec::new();
        self.view.send_modify(|view| {
            let (next, fresh) = reducer::merge_reporting(view, delta);
            *view = Arc::new(next);
            accepted = fresh;
        });
        if !accepted.is_empty() {
            let added = self.ingest_alerts(&accepted);
            debug!(new_alerts = added, "delta applied");
        }
    }

    /// Re-delivered ids reorder the store, so any non-empty batch counts as
    /// a change.
    fn ingest_alerts(&self, anomalies: &[Anomaly]) -> usize {
        if anomalies.is_empty() {
            return 0;
        }
        let mut added = 0;
        self.alerts.send_modify(|alerts| {
            added = Arc::make_mut(alerts).ingest(anomalies);
        });
        added
    }

    /// Mark an alert acknowledged. Returns whether anything changed.
    pub fn acknowledge(&self, id: &AnomalyId) -> bool {
        self.alerts.send_if_modified(|alerts| {
            let pending = alerts.get(id).is_some_and(|a| !a.acknowledged);
            pending && Arc::make_mut(alerts).acknowledge(id)
        })
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Record a failed snapshot fetch. The view model is left untouched.
    pub fn snapshot_failed(&self, message: impl Into<String>, auth_expired: bool) {
        let message = message.into();
        self.update_health(|h| {
            h.snapshot_ok = false;
            h.snapshot_error = Some(message);
            h.auth_expired |= auth_expired;
        });
    }

    /// Fold a stream status change into the connection state.
    pub fn stream_status(&self, status: &StreamStatus) {
        self.update_health(|h| match status {
            StreamStatus::Connected => h.stream_error = None,
            StreamStatus::Disconnected { reason } => h.stream_error = Some(reason.clone()),
            StreamStatus::Rejected { reason } => {
                h.stream_error = Some(reason.clone());
                h.auth_expired = true;
            }
            StreamStatus::Connecting | StreamStatus::Stopped => {}
        });
    }

    /// Record a stream that could not be started at all.
    pub fn stream_failed(&self, message: impl Into<String>) {
        let message = message.into();
        self.update_health(|h| h.stream_error = Some(message));
    }

    fn update_health(&self, f: impl FnOnce(&mut Health)) {
        self.health.send_modify(f);
        let next = self.health.borrow().connection();
        self.connection.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Anomaly, Severity};
    use pretty_assertions::assert_eq;

    fn anomaly(id: u64) -> Anomaly {
        Anomaly {
            id: AnomalyId::from(id),
            timestamp: None,
            severity: Severity::Medium,
            kind: "Traffic Spike".into(),
            source: "10.0.0.7".into(),
            score: 55.0,
            description: None,
        }
    }

    fn snapshot_with(ids: &[u64]) -> Snapshot {
        Snapshot {
            anomalies: ids.iter().copied().map(anomaly).collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn starts_disconnected_without_error() {
        let store = DashboardStore::new();
        assert_eq!(store.connection(), ConnectionState::default());
        assert!(store.view().is_empty());
    }

    #[test]
    fn snapshot_connects_and_derives_alerts() {
        let store = DashboardStore::new();
        store.apply_snapshot(snapshot_with(&[1, 2]));
        assert!(store.connection().is_connected);
        assert_eq!(store.alerts().len(), 2);
        assert_eq!(store.alerts().unacknowledged_count(), 2);
    }

    #[test]
    fn acknowledgement_survives_snapshot_and_delta() {
        let store = DashboardStore::new();
        store.apply_snapshot(snapshot_with(&[1]));
        assert!(store.acknowledge(&AnomalyId::from(1)));
        assert!(!store.acknowledge(&AnomalyId::from(1)));

        store.apply_delta(&Delta {
            anomalies: vec![anomaly(1)],
            ..Delta::default()
        });
        store.apply_snapshot(snapshot_with(&[1]));

        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts.get(&AnomalyId::from(1)).unwrap().acknowledged);
    }

    #[test]
    fn acknowledged_alert_survives_refetch_and_newer_anomalies() {
        let store = DashboardStore::new();
        let first: Vec<u64> = (1..=100).collect();
        store.apply_snapshot(snapshot_with(&first));
        assert!(store.acknowledge(&AnomalyId::from(1)));

        let refetch: Vec<u64> = std::iter::once(1).chain(101..=150).collect();
        store.apply_snapshot(snapshot_with(&refetch));
        assert!(store.alerts().get(&AnomalyId::from(1)).unwrap().acknowledged);

        store.apply_delta(&Delta {
            anomalies: vec![anomaly(200)],
            ..Delta::default()
        });

        assert!(store.view().anomalies.iter().any(|a| a.id == AnomalyId::from(1)));
        let alerts = store.alerts();
        assert!(alerts.get(&AnomalyId::from(1)).unwrap().acknowledged);
        assert_eq!(alerts.len(), 100);
    }

    #[test]
    fn failed_snapshot_keeps_previous_view() {
        let store = DashboardStore::new();
        store.apply_snapshot(snapshot_with(&[1]));
        let before = store.view();

        store.snapshot_failed("HTTP transport error: connection refused", false);

        assert_eq!(store.view(), before);
        let conn = store.connection();
        assert!(!conn.is_connected);
        assert_eq!(
            conn.last_error.as_deref(),
            Some("HTTP transport error: connection refused")
        );
    }

    #[test]
    fn stream_error_disconnects_until_restored() {
        let store = DashboardStore::new();
        store.apply_snapshot(snapshot_with(&[]));

        store.stream_status(&StreamStatus::Disconnected {
            reason: "closed by server".into(),
        });
        assert_eq!(
            store.connection(),
            ConnectionState::disconnected("closed by server")
        );

        store.stream_status(&StreamStatus::Connecting);
        assert!(!store.connection().is_connected);

        store.stream_status(&StreamStatus::Connected);
        assert_eq!(store.connection(), ConnectionState::connected());
    }

    #[test]
    fn rejection_flags_expired_session() {
        let store = DashboardStore::new();
        store.stream_status(&StreamStatus::Rejected {
            reason: "invalid token".into(),
        });
        let conn = store.connection();
        assert!(conn.auth_expired);
        assert!(!conn.is_connected);
    }

    #[tokio::test]
    async fn subscribers_see_merges() {
        let store = DashboardStore::new();
        let mut views = store.subscribe_view();
        store.apply_delta(&Delta {
            anomalies: vec![anomaly(9)],
            ..Delta::default()
        });
        let view = views.changed().await.unwrap();
        assert_eq!(view.anomalies.len(), 1);
        assert_eq!(view.stats.alert_count, 1);
    }

    #[test]
    fn empty_delta_does_not_notify() {
        let store = DashboardStore::new();
        let views = store.view.subscribe();
        store.apply_delta(&Delta::default());
        assert!(!views.has_changed().unwrap());
    }
}
