#![allow(clippy::unwrap_used)]
// End-to-end tests for `Monitor` against a fake backend.
//
// REST-only cases use wiremock. Cases that need the live stream use a
// small in-process server that answers `GET /api/network/overview` and
// hands websocket upgrades to the test.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netpulse_core::{
    AnomalyId, CoreError, Monitor, MonitorConfig, ReconnectConfig, StreamStatus, ViewStream,
};

type ServerSocket = WebSocketStream<TcpStream>;

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
const TIMEOUT: Duration = Duration::from_secs(5);

// ── Fake backend ────────────────────────────────────────────────────

struct Backend {
    url: String,
    sockets: mpsc::Receiver<ServerSocket>,
    overview_hits: Arc<AtomicUsize>,
}

async fn spawn_backend(overview: Value) -> Backend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, sockets) = mpsc::channel(4);
    let overview_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&overview_hits);
    let body = overview.to_string();

    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else {
                return;
            };
            let tx = tx.clone();
            let hits = Arc::clone(&hits);
            let body = body.clone();
            tokio::spawn(async move { serve(tcp, tx, &hits, &body).await });
        }
    });

    Backend {
        url,
        sockets,
        overview_hits,
    }
}

async fn serve(mut tcp: TcpStream, tx: mpsc::Sender<ServerSocket>, hits: &AtomicUsize, body: &str) {
    let mut peek = [0u8; 256];
    let n = tcp.peek(&mut peek).await.unwrap();
    if String::from_utf8_lossy(&peek[..n]).contains("/socket.io/") {
        let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let _ = tx.send(ws).await;
        return;
    }

    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tcp.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        head.extend_from_slice(&buf[..n]);
    }

    let request_line = String::from_utf8_lossy(&head).lines().next().unwrap_or_default().to_owned();
    let response = if request_line.starts_with("GET /api/network/overview") {
        hits.fetch_add(1, Ordering::SeqCst);
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    } else {
        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_owned()
    };
    let _ = tcp.write_all(response.as_bytes()).await;
    let _ = tcp.shutdown().await;
}

impl Backend {
    /// Accept the next stream connection and complete the handshake.
    async fn accept_stream(&mut self) -> ServerSocket {
        let mut ws = tokio::time::timeout(TIMEOUT, self.sockets.recv())
            .await
            .unwrap()
            .unwrap();
        send(&mut ws, OPEN).await;
        assert_eq!(next_text(&mut ws).await, r#"40{"token":"tok-1"}"#);
        send(&mut ws, r#"40{"sid":"sock-1"}"#).await;
        ws
    }
}

async fn next_text(ws: &mut ServerSocket) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
            Some(Ok(Message::Close(_)) | Err(_)) | None => return String::new(),
            Some(Ok(_)) => {}
        }
    }
}

async fn send(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::text(text.to_owned())).await.unwrap();
}

// ── Helpers ─────────────────────────────────────────────────────────

fn live_config(url: &str) -> MonitorConfig {
    let mut config = MonitorConfig::from_url(url)
        .unwrap()
        .with_token(SecretString::from("tok-1".to_owned()));
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        max_retries: None,
    };
    config
}

fn overview_with_anomaly() -> Value {
    json!({
        "stats": { "devices": 1, "traffic_rate": "5.00 Mbps", "alert_count": 1, "anomaly_count": 1 },
        "traffic_data": [{ "timestamp": "2026-03-01T10:00:00", "value": 5.0 }],
        "protocol_distribution": { "TCP": 70.0, "UDP": 30.0 },
        "top_talkers": [{ "ip": "10.0.0.1", "total": 12.0 }],
        "recent_anomalies": [{
            "id": 1,
            "timestamp": "2026-03-01T10:00:00",
            "severity": "medium",
            "type": "Traffic Spike",
            "source": "10.0.0.1",
            "score": 62.5
        }],
        "devices": [{ "ip": "10.0.0.1" }]
    })
}

async fn until<T: Send + Sync + 'static>(
    stream: &mut ViewStream<T>,
    pred: impl Fn(&T) -> bool,
) -> Arc<T> {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let value = stream.latest();
            if pred(&value) {
                return value;
            }
            stream.changed().await.unwrap();
        }
    })
    .await
    .unwrap()
}

async fn wait_connected(monitor: &Monitor) {
    let mut conn = monitor.subscribe_connection();
    tokio::time::timeout(TIMEOUT, conn.wait_for(|c| c.is_connected))
        .await
        .unwrap()
        .unwrap();
}

// ── Live tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_acknowledgement_survives_redelivery() {
    let mut backend = spawn_backend(overview_with_anomaly()).await;
    let monitor = Monitor::new(live_config(&backend.url)).unwrap();
    let mut alerts = monitor.subscribe_alerts();

    let sub = monitor.connect();
    let snapshot_alerts = until(&mut alerts, |a| a.len() == 1).await;
    let alert = snapshot_alerts.get(&AnomalyId::from(1)).unwrap();
    assert_eq!(alert.title, "Traffic Spike");
    assert_eq!(alert.description, "Detected from 10.0.0.1");
    assert!(!alert.acknowledged);

    assert!(monitor.acknowledge(&AnomalyId::from(1)));
    assert!(monitor.alerts().get(&AnomalyId::from(1)).unwrap().acknowledged);

    let mut ws = backend.accept_stream().await;
    send(
        &mut ws,
        r#"42["new_anomalies",[{"id":1,"severity":"medium","type":"Traffic Spike"},{"id":"2","severity":"high","type":"Port Scan","source":"10.0.0.8"}]]"#,
    )
    .await;

    let after = until(&mut alerts, |a| a.len() == 2).await;
    assert!(after.get(&AnomalyId::from(1)).unwrap().acknowledged);
    assert!(!after.get(&AnomalyId::from(2)).unwrap().acknowledged);
    assert_eq!(after.unacknowledged_count(), 1);
    assert_eq!(monitor.view().anomalies.len(), 2);

    sub.disconnect();
    assert_eq!(next_text(&mut ws).await, "41");
}

#[tokio::test]
async fn test_burst_inside_window_keeps_later_devices() {
    let mut backend = spawn_backend(json!({ "devices": [{ "ip": "10.0.0.1" }] })).await;
    let monitor = Monitor::new(live_config(&backend.url)).unwrap();
    let mut views = monitor.subscribe_view();

    let sub = monitor.connect();
    wait_connected(&monitor).await;
    let mut ws = backend.accept_stream().await;
    let mut status = sub.stream_status().unwrap();
    tokio::time::timeout(TIMEOUT, status.wait_for(StreamStatus::is_connected))
        .await
        .unwrap()
        .unwrap();

    send(
        &mut ws,
        r#"42["network_update",{"devices":[{"ip":"10.0.0.2"},{"ip":"10.0.0.3"}],"anomalies":[{"id":10,"severity":"low"}]}]"#,
    )
    .await;
    send(
        &mut ws,
        r#"42["network_update",{"devices":[{"ip":"10.0.0.4","name":"nas"}],"anomalies":[{"id":11,"severity":"high"}]}]"#,
    )
    .await;

    let view = until(&mut views, |v| !v.anomalies.is_empty()).await;
    let ips: Vec<_> = view.devices.iter().map(|d| d.ip.as_str()).collect();
    assert_eq!(ips, ["10.0.0.4"]);
    let ids: Vec<_> = view.anomalies.iter().map(|a| a.id.to_string()).collect();
    assert_eq!(ids, ["10", "11"]);
    assert_eq!(view.stats.devices, 1);
    assert_eq!(view.stats.anomaly_count, 2);
    assert_eq!(view.stats.alert_count, 1);
}

#[tokio::test]
async fn test_stream_reconnect_refetches_snapshot() {
    let mut backend = spawn_backend(overview_with_anomaly()).await;
    let monitor = Monitor::new(live_config(&backend.url)).unwrap();
    let sub = monitor.connect();
    wait_connected(&monitor).await;
    assert_eq!(backend.overview_hits.load(Ordering::SeqCst), 1);

    let ws = backend.accept_stream().await;
    drop(ws);

    let mut conn = monitor.subscribe_connection();
    tokio::time::timeout(TIMEOUT, conn.wait_for(|c| !c.is_connected))
        .await
        .unwrap()
        .unwrap();
    assert!(monitor.connection().last_error.is_some());

    let _ws = backend.accept_stream().await;
    tokio::time::timeout(TIMEOUT, async {
        while backend.overview_hits.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    wait_connected(&monitor).await;

    sub.disconnect();
}

#[tokio::test]
async fn test_rejected_token_flags_expired_session() {
    let mut backend = spawn_backend(json!({})).await;
    let monitor = Monitor::new(live_config(&backend.url)).unwrap();
    let sub = monitor.connect();

    let mut ws = tokio::time::timeout(TIMEOUT, backend.sockets.recv())
        .await
        .unwrap()
        .unwrap();
    send(&mut ws, OPEN).await;
    let _connect = next_text(&mut ws).await;
    send(&mut ws, r#"44{"message":"invalid token"}"#).await;

    let mut conn = monitor.subscribe_connection();
    let state = tokio::time::timeout(TIMEOUT, conn.wait_for(|c| c.auth_expired))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert!(!state.is_connected);
    assert_eq!(state.last_error.as_deref(), Some("invalid token"));
    drop(sub);
}

// ── REST-only tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_no_token_means_no_stream_and_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let monitor = Monitor::new(MonitorConfig::from_url(&server.uri()).unwrap()).unwrap();
    let sub = monitor.connect();
    assert!(sub.stream_status().is_none());

    let mut conn = monitor.subscribe_connection();
    let state = tokio::time::timeout(TIMEOUT, conn.wait_for(|c| c.last_error.is_some()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert!(state.auth_expired);
    assert!(!state.is_connected);
}

#[tokio::test]
async fn test_late_snapshot_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(overview_with_anomaly())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let mut config = live_config(&server.uri());
    config.stream_enabled = false;
    let monitor = Monitor::new(config).unwrap();

    let sub = monitor.connect();
    assert!(sub.disconnect());
    assert!(!sub.disconnect());
    drop(sub);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(monitor.view().is_empty());
    assert!(monitor.alerts().is_empty());
    assert!(!monitor.connection().is_connected);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_view() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_with_anomaly()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;

    let mut config = live_config(&server.uri());
    config.stream_enabled = false;
    let monitor = Monitor::new(config).unwrap();

    assert_ok!(monitor.refresh().await);
    let before = monitor.view();
    assert!(monitor.connection().is_connected);

    let err = assert_err!(monitor.refresh().await);
    assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    assert_eq!(monitor.view(), before);

    let conn = monitor.connection();
    assert!(!conn.is_connected);
    assert!(conn.last_error.unwrap().contains("db down"));
}

#[tokio::test]
async fn test_oneshot_loads_snapshot_and_ranks_talkers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_with_anomaly()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/network/top-talkers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ip": "10.0.0.1", "total": 3.0 },
            { "ip": "10.0.0.2", "total": 9.5, "is_anomalous": true },
        ])))
        .mount(&server)
        .await;

    let (stats, talkers) = Monitor::oneshot(live_config(&server.uri()), |monitor| async move {
        let talkers = monitor.top_talkers().await?;
        Ok((monitor.view().stats.clone(), talkers))
    })
    .await
    .unwrap();

    assert_eq!(stats.traffic_rate, "5.00 Mbps");
    assert_eq!(stats.alert_count, 1);
    let ips: Vec<_> = talkers.iter().map(|t| t.ip.as_str()).collect();
    assert_eq!(ips, ["10.0.0.2", "10.0.0.1"]);
    assert_eq!(talkers[1].name, "10.0.0.1");
}
