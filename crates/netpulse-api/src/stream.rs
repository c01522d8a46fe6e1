//! Socket.IO event stream with auto-reconnect.
//!
//! Connects to the backend's `/socket.io` endpoint over a single websocket,
//! authenticates in the CONNECT packet and streams the two recognized
//! events through a [`tokio::sync::broadcast`] channel. Connection health
//! is published on a [`tokio::sync::watch`] channel so consumers can render
//! a disconnected banner without parsing errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use netpulse_api::stream::{ReconnectConfig, StreamHandle};
//! use tokio_util::sync::CancellationToken;
//!
//! let handle = StreamHandle::connect(&base_url, &token, ReconnectConfig::default(), CancellationToken::new())?;
//! let mut rx = handle.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::socketio::{self, EnginePacket, SocketPacket};
use crate::types::{NetworkUpdate, WireAnomaly};

// ── Channel capacity ─────────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Silence tolerated before the Engine.IO handshake arrives.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

pub const NETWORK_UPDATE_EVENT: &str = "network_update";
pub const NEW_ANOMALIES_EVENT: &str = "new_anomalies";

// ── Events ───────────────────────────────────────────────────────────

/// A recognized event from the backend stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Partial state: any subset of traffic, protocols, talkers, devices,
    /// anomalies.
    NetworkUpdate(NetworkUpdate),
    /// Batch of newly detected anomalies.
    NewAnomalies(Vec<WireAnomaly>),
}

/// Connection health of the stream task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Connected,
    /// Lost or failed; the task is backing off and will retry.
    Disconnected { reason: String },
    /// The server refused the credential. No further attempts are made.
    Rejected { reason: String },
    /// Reconnect budget exhausted or shut down.
    Stopped,
}

impl StreamStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Error text for banners, if this status represents a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Disconnected { reason } | Self::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running stream task.
///
/// The task runs until [`shutdown`](Self::shutdown) is called, the cancel
/// token passed to [`connect`](Self::connect) fires, the server rejects
/// the token, or the reconnect budget runs out.
pub struct StreamHandle {
    event_rx: broadcast::Receiver<Arc<StreamEvent>>,
    status_rx: watch::Receiver<StreamStatus>,
    cancel: CancellationToken,
}

impl StreamHandle {
    /// Spawn the stream task. Returns immediately; the first connection
    /// attempt happens in the background.
    pub fn connect(
        base_url: &Url,
        token: &SecretString,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let ws_url = socket_url(base_url)?;
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(StreamStatus::Connecting);

        let auth = json!({ "token": token.expose_secret() });
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            ws_loop(ws_url, auth, event_tx, status_tx, reconnect, task_cancel).await;
        });

        Ok(Self {
            event_rx,
            status_rx,
            cancel,
        })
    }

    /// Get a new broadcast receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StreamEvent>> {
        self.event_rx.resubscribe()
    }

    /// Watch the connection status.
    pub fn status(&self) -> watch::Receiver<StreamStatus> {
        self.status_rx.clone()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// `http(s)://host[:port]/...` -> `ws(s)://host[:port]/socket.io/?EIO=4&transport=websocket`
pub fn socket_url(base_url: &Url) -> Result<Url, Error> {
    let mut url = base_url.clone();
    let scheme = match base_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::WebSocketConnect(format!(
                "unsupported URL scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot use {scheme} for {base_url}")))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    auth: Value,
    event_tx: broadcast::Sender<Arc<StreamEvent>>,
    status_tx: watch::Sender<StreamStatus>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        status_tx.send_replace(StreamStatus::Connecting);

        // Cancellation is observed inside so the socket can say goodbye.
        let result =
            connect_and_read(&ws_url, &auth, &event_tx, &status_tx, &cancel, &mut attempt).await;

        let reason = match result {
            Ok(()) if cancel.is_cancelled() => break,
            Ok(()) => {
                tracing::info!("stream closed by server, reconnecting");
                "closed by server".to_owned()
            }
            Err(Error::StreamRejected { message }) => {
                tracing::warn!(reason = %message, "stream credential rejected, not retrying");
                status_tx.send_replace(StreamStatus::Rejected { reason: message });
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "stream error");
                e.to_string()
            }
        };
        status_tx.send_replace(StreamStatus::Disconnected { reason });

        if let Some(max) = reconnect.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "stream reconnection limit reached, giving up");
                break;
            }
        }

        let delay = calculate_backoff(attempt, &reconnect);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    status_tx.send_replace(StreamStatus::Stopped);
    tracing::debug!("stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one websocket, perform the Socket.IO handshake and read until
/// the connection drops. `attempt` is reset once the server accepts the
/// CONNECT.
async fn connect_and_read(
    url: &Url,
    auth: &Value,
    event_tx: &broadcast::Sender<Arc<StreamEvent>>,
    status_tx: &watch::Sender<StreamStatus>,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to stream");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        connected = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri)) => {
            connected.map_err(map_connect_error)?
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut deadline = HANDSHAKE_TIMEOUT;

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort: tell the server this socket is going away.
                let _ = write.send(tungstenite::Message::text("41")).await;
                let _ = write.close().await;
                return Ok(());
            }
            frame = tokio::time::timeout(deadline, read.next()) => frame,
        };

        let frame = frame.map_err(|_| Error::HeartbeatTimeout {
            timeout_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
        })?;

        let text = match frame {
            Some(Ok(tungstenite::Message::Text(text))) => text,
            Some(Ok(tungstenite::Message::Close(frame))) => {
                if let Some(ref cf) = frame {
                    tracing::info!(code = %cf.code, reason = %cf.reason, "stream close frame received");
                }
                return Ok(());
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => {
                tracing::info!("stream ended");
                return Ok(());
            }
        };

        let Some(packet) = socketio::decode(&text) else {
            tracing::debug!(frame = %text.as_str(), "ignoring malformed stream frame");
            continue;
        };

        match packet {
            EnginePacket::Open(info) => {
                tracing::debug!(sid = %info.sid, "engine.io handshake");
                deadline = info.heartbeat_deadline();
                send_text(&mut write, socketio::encode_connect(auth)).await?;
            }
            EnginePacket::Ping => send_text(&mut write, socketio::PONG.to_owned()).await?,
            EnginePacket::Close | EnginePacket::Message(SocketPacket::Disconnect) => {
                return Ok(());
            }
            EnginePacket::Message(SocketPacket::Connect(_)) => {
                tracing::info!("stream connected");
                *attempt = 0;
                status_tx.send_replace(StreamStatus::Connected);
            }
            EnginePacket::Message(SocketPacket::ConnectError(payload)) => {
                return Err(Error::StreamRejected {
                    message: socketio::connect_error_message(payload.as_ref()),
                });
            }
            EnginePacket::Message(SocketPacket::Event { name, data }) => {
                dispatch_event(&name, data, event_tx);
            }
            EnginePacket::Pong
            | EnginePacket::Noop
            | EnginePacket::Message(SocketPacket::Unsupported) => {}
        }
    }
}

async fn send_text<S>(write: &mut S, text: String) -> Result<(), Error>
where
    S: futures_util::Sink<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(tungstenite::Message::text(text))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

/// An HTTP 401/403 on the upgrade is a credential problem, not a transport
/// one.
fn map_connect_error(err: tungstenite::Error) -> Error {
    if let tungstenite::Error::Http(ref resp) = err {
        let status = resp.status().as_u16();
        if status == 401 || status == 403 {
            return Error::StreamRejected {
                message: format!("upgrade refused (HTTP {status})"),
            };
        }
    }
    Error::WebSocketConnect(err.to_string())
}

// ── Event parsing ────────────────────────────────────────────────────

/// Map a named Socket.IO event to a [`StreamEvent`] and broadcast it.
/// Unknown names and payloads that don't fit are dropped.
fn dispatch_event(name: &str, data: Value, event_tx: &broadcast::Sender<Arc<StreamEvent>>) {
    let event = match name {
        NETWORK_UPDATE_EVENT => serde_json::from_value(data).map(StreamEvent::NetworkUpdate),
        NEW_ANOMALIES_EVENT => serde_json::from_value(data).map(StreamEvent::NewAnomalies),
        other => {
            tracing::trace!(event = other, "ignoring unrecognized stream event");
            return;
        }
    };

    match event {
        Ok(event) => {
            // No subscribers right now is fine.
            let _ = event_tx.send(Arc::new(event));
        }
        Err(e) => tracing::debug!(event = name, error = %e, "dropping malformed stream payload"),
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powf(f64::from(attempt.min(32)));
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn socket_url_swaps_scheme_and_path() {
        let url = socket_url(&Url::parse("http://localhost:5000").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );

        let url = socket_url(&Url::parse("https://mon.example.com/app/").unwrap()).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://mon.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn socket_url_rejects_unknown_scheme() {
        assert!(socket_url(&Url::parse("ftp://host").unwrap()).is_err());
    }

    #[test]
    fn backoff_increases_then_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };
        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);
        assert!(d1 > d0);
        assert!(d2 > d1);
        assert!(calculate_backoff(20, &config) <= Duration::from_millis(12_500));
    }

    #[test]
    fn network_update_is_broadcast() {
        let (tx, mut rx) = broadcast::channel(8);
        dispatch_event(
            NETWORK_UPDATE_EVENT,
            json!({"devices": [{"ip": "10.0.0.2"}]}),
            &tx,
        );
        let event = rx.try_recv().unwrap();
        let StreamEvent::NetworkUpdate(update) = event.as_ref() else {
            panic!("expected network update");
        };
        assert_eq!(update.devices.as_ref().unwrap()[0].ip, "10.0.0.2");
        assert!(update.traffic_data.is_none());
    }

    #[test]
    fn anomaly_batch_is_broadcast() {
        let (tx, mut rx) = broadcast::channel(8);
        dispatch_event(
            NEW_ANOMALIES_EVENT,
            json!([{"id": 3, "severity": "high", "type": "DDoS"}]),
            &tx,
        );
        let event = rx.try_recv().unwrap();
        assert!(matches!(event.as_ref(), StreamEvent::NewAnomalies(list) if list.len() == 1));
    }

    #[test]
    fn unknown_and_malformed_events_are_dropped() {
        let (tx, mut rx) = broadcast::channel::<Arc<StreamEvent>>(8);
        dispatch_event("chat_message", json!({"text": "hi"}), &tx);
        dispatch_event(NEW_ANOMALIES_EVENT, json!({"not": "a list"}), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn status_error_text() {
        assert_eq!(StreamStatus::Connected.error(), None);
        assert_eq!(
            StreamStatus::Disconnected {
                reason: "reset".into()
            }
            .error(),
            Some("reset")
        );
    }
}
