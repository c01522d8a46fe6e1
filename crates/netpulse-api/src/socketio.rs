//! Minimal Engine.IO v4 / Socket.IO v5 text-packet codec.
//!
//! Only the websocket transport is supported, so every frame is exactly one
//! Engine.IO packet. Binary attachments are not used by the backend and are
//! treated as unrecognized.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Engine.IO pong, sent in answer to a server ping.
pub const PONG: &str = "3";

/// Engine.IO packet as received over the websocket.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

/// Handshake parameters from the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenInfo {
    /// Longest silence tolerated before the connection counts as dead.
    pub fn heartbeat_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// Socket.IO packet carried inside an Engine.IO `message`.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Option<Value>),
    /// Acks, binary events or packets for another namespace.
    Unsupported,
}

/// Decode one text frame. Returns `None` for anything malformed.
pub fn decode(frame: &str) -> Option<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest).ok().map(EnginePacket::Open),
        '1' => Some(EnginePacket::Close),
        '2' => Some(EnginePacket::Ping),
        '3' => Some(EnginePacket::Pong),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '6' => Some(EnginePacket::Noop),
        _ => None,
    }
}

fn decode_socket(packet: &str) -> Option<SocketPacket> {
    let mut chars = packet.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();

    // Packets addressed to a namespace other than "/" are not ours.
    if rest.starts_with('/') {
        return Some(SocketPacket::Unsupported);
    }

    match kind {
        '0' => Some(SocketPacket::Connect(optional_json(rest))),
        '1' => Some(SocketPacket::Disconnect),
        '2' => decode_event(rest),
        '4' => Some(SocketPacket::ConnectError(optional_json(rest))),
        '3' | '5' | '6' => Some(SocketPacket::Unsupported),
        _ => None,
    }
}

fn optional_json(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        None
    } else {
        serde_json::from_str(raw).ok()
    }
}

/// `["name", payload]`, optionally preceded by a numeric ack id.
fn decode_event(raw: &str) -> Option<SocketPacket> {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_digit());
    let Value::Array(mut items) = serde_json::from_str(body).ok()? else {
        return None;
    };
    if items.is_empty() {
        return None;
    }
    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return None,
    };
    let data = if items.is_empty() {
        Value::Null
    } else {
        items.swap_remove(0)
    };
    Some(SocketPacket::Event { name, data })
}

/// CONNECT to the default namespace with an auth payload.
pub fn encode_connect(auth: &Value) -> String {
    format!("40{auth}")
}

/// Human-readable reason from a CONNECT_ERROR payload.
pub fn connect_error_message(payload: Option<&Value>) -> String {
    payload
        .and_then(|v| v.get("message").and_then(Value::as_str).or_else(|| v.as_str()))
        .unwrap_or("connection refused")
        .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let packet = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":5000,"maxPayload":1000000}"#)
            .unwrap();
        let EnginePacket::Open(info) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(info.sid, "abc");
        assert_eq!(info.heartbeat_deadline(), Duration::from_millis(30_000));
    }

    #[test]
    fn decodes_ping_and_close() {
        assert_eq!(decode("2"), Some(EnginePacket::Ping));
        assert_eq!(decode("1"), Some(EnginePacket::Close));
    }

    #[test]
    fn decodes_named_event() {
        let packet = decode(r#"42["new_anomalies",[{"id":1}]]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "new_anomalies".into(),
                data: json!([{"id": 1}]),
            })
        );
    }

    #[test]
    fn event_with_ack_id_still_decodes() {
        let packet = decode(r#"4212["network_update",{}]"#).unwrap();
        assert!(matches!(
            packet,
            EnginePacket::Message(SocketPacket::Event { ref name, .. }) if name == "network_update"
        ));
    }

    #[test]
    fn event_without_payload_gets_null() {
        let packet = decode(r#"42["ping_me"]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                name: "ping_me".into(),
                data: Value::Null,
            })
        );
    }

    #[test]
    fn foreign_namespace_is_unsupported() {
        assert_eq!(
            decode(r#"42/admin,["network_update",{}]"#),
            Some(EnginePacket::Message(SocketPacket::Unsupported))
        );
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("9"), None);
        assert_eq!(decode("42not json"), None);
        assert_eq!(decode("42[]"), None);
        assert_eq!(decode("42[1,2]"), None);
    }

    #[test]
    fn connect_error_reason() {
        let EnginePacket::Message(SocketPacket::ConnectError(payload)) =
            decode(r#"44{"message":"invalid token"}"#).unwrap()
        else {
            panic!("expected connect error");
        };
        assert_eq!(connect_error_message(payload.as_ref()), "invalid token");
        assert_eq!(connect_error_message(None), "connection refused");
    }

    #[test]
    fn connect_packet_carries_auth() {
        assert_eq!(encode_connect(&json!({"token": "t"})), r#"40{"token":"t"}"#);
    }
}
