// ── Monitor ──
//
// Lifecycle of a live dashboard: one snapshot fetch per connect, one
// Socket.IO stream, one merge task. The merge task and the snapshot
// loader both hand their results to the `DashboardStore`; nothing else
// writes to it apart from user acknowledgements.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netpulse_api::network::AnomalyQuery;
use netpulse_api::{ApiClient, StreamEvent, StreamHandle, StreamStatus};

use crate::alerts::AlertStore;
use crate::coalesce::Throttle;
use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::model::{
    Anomaly, AnomalyId, ConnectionState, Device, TopTalker, TrafficPoint, ViewModel, rank_talkers,
};
use crate::reducer::{Delta, Snapshot};
use crate::store::DashboardStore;
use crate::stream::ViewStream;

// ── Monitor ──────────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable. Owns the REST client and the dashboard store; live
/// updates run only while a [`Subscription`] from [`connect`](Self::connect)
/// is alive.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    client: ApiClient,
    store: Arc<DashboardStore>,
}

impl Monitor {
    /// Build the client. Does not touch the network.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        let client = config.client()?;
        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                client,
                store: Arc::new(DashboardStore::new()),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Start the snapshot fetch and, with a token, the live stream.
    ///
    /// Returns immediately. Everything started here stops when the
    /// returned [`Subscription`] is disconnected or dropped.
    pub fn connect(&self) -> Subscription {
        let cancel = CancellationToken::new();

        let monitor = self.clone();
        let loader_cancel = cancel.clone();
        tokio::spawn(async move {
            monitor.load_snapshot(&loader_cancel).await;
        });

        let stream_status = if self.inner.config.stream_enabled {
            self.start_stream(&cancel)
        } else {
            None
        };

        info!(url = %self.inner.config.base_url, "monitor connected");
        Subscription {
            cancel,
            stream_status,
            disconnected: AtomicBool::new(false),
        }
    }

    fn start_stream(&self, cancel: &CancellationToken) -> Option<watch::Receiver<StreamStatus>> {
        let Some(token) = self.inner.config.token.as_ref() else {
            warn!("no session token, live stream not started");
            return None;
        };

        let handle = match StreamHandle::connect(
            self.inner.client.base_url(),
            token,
            self.inner.config.reconnect.clone(),
            cancel.child_token(),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "cannot start live stream");
                self.inner.store.stream_failed(e.to_string());
                return None;
            }
        };

        tokio::spawn(merge_task(
            handle.subscribe(),
            Arc::clone(&self.inner.store),
            self.inner.config.merge_window,
            cancel.clone(),
        ));
        tokio::spawn(status_task(handle.status(), self.clone(), cancel.clone()));

        Some(handle.status())
    }

    /// Fetch the overview, unless the subscription is torn down first.
    async fn load_snapshot(&self, cancel: &CancellationToken) {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = self.inner.client.overview() => result,
        };
        if cancel.is_cancelled() {
            debug!("discarding snapshot that arrived after disconnect");
            return;
        }
        match result {
            Ok(overview) => self.inner.store.apply_snapshot(Snapshot::from(overview)),
            Err(e) => {
                warn!(error = %e, "snapshot fetch failed");
                self.inner
                    .store
                    .snapshot_failed(e.to_string(), e.is_auth_expired());
            }
        }
    }

    /// Fetch the overview now and apply it. Errors are also recorded in
    /// the connection state.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        match self.inner.client.overview().await {
            Ok(overview) => {
                self.inner.store.apply_snapshot(Snapshot::from(overview));
                Ok(())
            }
            Err(e) => {
                self.inner
                    .store
                    .snapshot_failed(e.to_string(), e.is_auth_expired());
                Err(e.into())
            }
        }
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// Load one snapshot without a stream, then run `f`.
    pub async fn oneshot<F, Fut, T>(config: MonitorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Monitor) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut config = config;
        config.stream_enabled = false;
        let monitor = Self::new(config)?;
        monitor.refresh().await?;
        f(monitor).await
    }

    // ── User actions ─────────────────────────────────────────────────

    pub fn acknowledge(&self, id: &AnomalyId) -> bool {
        let changed = self.inner.store.acknowledge(id);
        if changed {
            debug!(alert = %id, "alert acknowledged");
        }
        changed
    }

    // ── State observation ────────────────────────────────────────────

    pub fn view(&self) -> Arc<ViewModel> {
        self.inner.store.view()
    }

    pub fn alerts(&self) -> Arc<AlertStore> {
        self.inner.store.alerts()
    }

    pub fn connection(&self) -> ConnectionState {
        self.inner.store.connection()
    }

    pub fn subscribe_view(&self) -> ViewStream<ViewModel> {
        self.inner.store.subscribe_view()
    }

    pub fn subscribe_alerts(&self) -> ViewStream<AlertStore> {
        self.inner.store.subscribe_alerts()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.store.subscribe_connection()
    }

    // ── Direct queries ───────────────────────────────────────────────

    pub async fn traffic(&self, hours: u32) -> Result<Vec<TrafficPoint>, CoreError> {
        let samples = self.inner.client.traffic(hours).await?;
        Ok(samples.into_iter().map(TrafficPoint::from).collect())
    }

    pub async fn anomalies(&self, query: &AnomalyQuery) -> Result<Vec<Anomaly>, CoreError> {
        let anomalies = self.inner.client.anomalies(query).await?;
        Ok(anomalies.into_iter().map(Anomaly::from).collect())
    }

    pub async fn devices(&self) -> Result<Vec<Device>, CoreError> {
        let devices = self.inner.client.devices().await?;
        Ok(devices.into_iter().map(Device::from).collect())
    }

    /// Ranked by total volume, descending.
    pub async fn top_talkers(&self) -> Result<Vec<TopTalker>, CoreError> {
        let talkers = self.inner.client.top_talkers().await?;
        let mut talkers: Vec<TopTalker> = talkers.into_iter().map(TopTalker::from).collect();
        rank_talkers(&mut talkers);
        Ok(talkers)
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Owned handle for a live dashboard session.
///
/// [`disconnect`](Self::disconnect) stops the stream, the merge task and
/// any snapshot still in flight. It runs exactly once, however many times
/// it is called; dropping the subscription calls it too.
pub struct Subscription {
    cancel: CancellationToken,
    stream_status: Option<watch::Receiver<StreamStatus>>,
    disconnected: AtomicBool,
}

impl Subscription {
    /// Returns `true` for the call that actually tore things down.
    pub fn disconnect(&self) -> bool {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();
        info!("monitor disconnected");
        true
    }

    pub fn is_active(&self) -> bool {
        !self.disconnected.load(Ordering::Acquire)
    }

    /// Raw stream status, if a stream was started.
    pub fn stream_status(&self) -> Option<watch::Receiver<StreamStatus>> {
        self.stream_status.clone()
    }

    /// Resolves once the subscription has been torn down.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Sole consumer of stream events: converts, throttles, merges.
async fn merge_task(
    mut events: broadcast::Receiver<Arc<StreamEvent>>,
    store: Arc<DashboardStore>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut throttle = Throttle::new(window);

    loop {
        let deadline = throttle.deadline();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = wait_until(deadline) => {
                if let Some(delta) = throttle.flush_due(Instant::now()) {
                    store.apply_delta(&delta);
                }
            }
            received = events.recv() => match received {
                Ok(event) => throttle.offer(Delta::from(event.as_ref()), Instant::now()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "merge task lagged, stream events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    if let Some(delta) = throttle.take() {
                        store.apply_delta(&delta);
                    }
                    debug!("stream ended, merge task exiting");
                    break;
                }
            },
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Mirrors stream health into the store and re-fetches the snapshot after
/// the stream comes back from a drop.
async fn status_task(
    mut status: watch::Receiver<StreamStatus>,
    monitor: Monitor,
    cancel: CancellationToken,
) {
    let mut was_down = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let current = status.borrow_and_update().clone();
        monitor.inner.store.stream_status(&current);

        match current {
            StreamStatus::Connected if was_down => {
                was_down = false;
                info!("stream restored, re-fetching snapshot");
                monitor.load_snapshot(&cancel).await;
            }
            StreamStatus::Disconnected { .. } => was_down = true,
            StreamStatus::Rejected { reason } => {
                warn!(%reason, "stream rejected the session token");
                break;
            }
            StreamStatus::Stopped => break,
            StreamStatus::Connected | StreamStatus::Connecting => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(100);

    fn update(ips: &[&str], anomaly_id: u64) -> Arc<StreamEvent> {
        let devices: Vec<_> = ips.iter().map(|ip| json!({ "ip": ip })).collect();
        let update = serde_json::from_value(json!({
            "devices": devices,
            "anomalies": [{ "id": anomaly_id, "severity": "high", "type": "Port Scan" }],
        }))
        .unwrap();
        Arc::new(StreamEvent::NetworkUpdate(update))
    }

    fn spawn_merge(
        store: &Arc<DashboardStore>,
    ) -> (
        broadcast::Sender<Arc<StreamEvent>>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let (tx, rx) = broadcast::channel(16);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(merge_task(rx, Arc::clone(store), WINDOW, cancel.clone()));
        (tx, cancel, task)
    }

    #[tokio::test(start_paused = true)]
    async fn events_inside_one_window_merge_once() {
        let store = Arc::new(DashboardStore::new());
        let (tx, cancel, task) = spawn_merge(&store);
        let mut views = store.subscribe_view();

        tx.send(update(&["10.0.0.1", "10.0.0.2"], 1)).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        tx.send(update(&["10.0.0.3"], 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.view().devices.is_empty(), "merged before the window closed");

        let view = views.changed().await.unwrap();
        let ips: Vec<_> = view.devices.iter().map(|d| d.ip.as_str()).collect();
        assert_eq!(ips, ["10.0.0.3"]);
        let ids: Vec<_> = view.anomalies.iter().map(|a| a.id.to_string()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(store.alerts().len(), 2);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(Arc::ptr_eq(&view, &store.view()), "second merge for one window");

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn merges_are_spaced_by_the_window() {
        let store = Arc::new(DashboardStore::new());
        let (tx, cancel, task) = spawn_merge(&store);
        let mut views = store.subscribe_view();

        let start = Instant::now();
        tx.send(update(&["10.0.0.1"], 1)).unwrap();
        views.changed().await.unwrap();
        let first = Instant::now();

        tx.send(update(&["10.0.0.2"], 2)).unwrap();
        views.changed().await.unwrap();
        let second = Instant::now();

        assert!(first - start >= WINDOW);
        assert!(second - first >= WINDOW);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_flushes_pending_update() {
        let store = Arc::new(DashboardStore::new());
        let (tx, _cancel, task) = spawn_merge(&store);

        tx.send(update(&["10.0.0.4"], 7)).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(store.view().devices.len(), 1);
        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_runs_once() {
        let monitor = Monitor::new(MonitorConfig::from_url("http://127.0.0.1:9").unwrap()).unwrap();
        let sub = monitor.connect();
        assert!(sub.is_active());
        assert!(sub.stream_status().is_none());

        assert!(sub.disconnect());
        assert!(!sub.disconnect());
        assert!(!sub.is_active());
        sub.closed().await;
        drop(sub);
    }
}
