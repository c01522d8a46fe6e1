#![allow(clippy::unwrap_used)]
// Integration tests for `StreamHandle` against an in-process Socket.IO peer.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use netpulse_api::{ReconnectConfig, StreamEvent, StreamHandle, StreamStatus};

type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

// ── Helpers ─────────────────────────────────────────────────────────

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (tcp, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(tcp).await.unwrap()
}

async fn next_text(ws: &mut ServerSocket) -> String {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Close(_) => return String::new(),
            _ => {}
        }
    }
}

async fn send(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::text(text.to_owned())).await.unwrap();
}

fn token() -> SecretString {
    SecretString::from("tok-1".to_owned())
}

fn no_retry() -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        max_retries: Some(0),
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_handshake_carries_token_and_events_flow() {
    let (listener, url) = listen().await;
    let handle = StreamHandle::connect(&url, &token(), no_retry(), CancellationToken::new()).unwrap();
    let mut events = handle.subscribe();
    let mut status = handle.status();

    let mut ws = accept(&listener).await;
    send(&mut ws, OPEN).await;
    assert_eq!(next_text(&mut ws).await, r#"40{"token":"tok-1"}"#);
    send(&mut ws, r#"40{"sid":"sock-1"}"#).await;

    tokio::time::timeout(Duration::from_secs(5), status.wait_for(StreamStatus::is_connected))
        .await
        .unwrap()
        .unwrap();

    send(&mut ws, r#"42["chat",{"text":"ignored"}]"#).await;
    send(&mut ws, "42garbage").await;
    send(&mut ws, r#"42["network_update",{"devices":[{"ip":"10.0.0.9"}]}]"#).await;
    send(&mut ws, r#"42["new_anomalies",[{"id":1,"severity":"high","type":"Port Scan"}]]"#).await;

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(
        matches!(first.as_ref(), StreamEvent::NetworkUpdate(u) if u.devices.as_ref().unwrap()[0].ip == "10.0.0.9")
    );

    let second = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(second.as_ref(), StreamEvent::NewAnomalies(list) if list.len() == 1));

    // Engine.IO heartbeat: ping is answered with pong.
    send(&mut ws, "2").await;
    assert_eq!(next_text(&mut ws).await, "3");

    handle.shutdown();
    assert_eq!(next_text(&mut ws).await, "41");
}

#[tokio::test]
async fn test_connect_error_stops_without_retry() {
    let (listener, url) = listen().await;
    let retrying = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
        max_retries: None,
    };
    let handle = StreamHandle::connect(&url, &token(), retrying, CancellationToken::new()).unwrap();
    let mut status = handle.status();

    let mut ws = accept(&listener).await;
    send(&mut ws, OPEN).await;
    let _connect = next_text(&mut ws).await;
    send(&mut ws, r#"44{"message":"invalid token"}"#).await;

    let final_status = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| matches!(s, StreamStatus::Rejected { .. })),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert_eq!(
        final_status,
        StreamStatus::Rejected {
            reason: "invalid token".into()
        }
    );

    // No second connection attempt arrives.
    let second = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(second.is_err(), "rejected stream must not reconnect");
}

#[tokio::test]
async fn test_server_drop_reports_disconnected_then_stops() {
    let (listener, url) = listen().await;
    let handle = StreamHandle::connect(&url, &token(), no_retry(), CancellationToken::new()).unwrap();
    let mut status = handle.status();

    let mut ws = accept(&listener).await;
    send(&mut ws, OPEN).await;
    let _connect = next_text(&mut ws).await;
    send(&mut ws, r#"40{"sid":"sock-1"}"#).await;
    status.wait_for(StreamStatus::is_connected).await.unwrap();

    drop(ws);

    let stopped = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == StreamStatus::Stopped),
    )
    .await;
    assert!(stopped.is_ok(), "stream should stop once the retry budget is spent");
}
