// Wire types for the netpulse backend.
//
// Every optional field the backend may omit is modeled as `Option` or
// `#[serde(default)]` here; default substitution (name -> ip, counters -> 0)
// is a domain concern and happens in `netpulse-core`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identifiers ─────────────────────────────────────────────────────

/// Identifier as sent by the backend: anomaly ids are integers, device ids
/// are usually the device IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ── Network data ────────────────────────────────────────────────────

/// One traffic sample. `timestamp` is kept as the raw ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDevice {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub connections: Option<Vec<String>>,
    #[serde(default)]
    pub anomalous: Option<bool>,
    #[serde(default)]
    pub inbound: Option<f64>,
    #[serde(default)]
    pub outbound: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTopTalker {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inbound: Option<f64>,
    #[serde(default)]
    pub outbound: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub is_anomalous: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAnomaly {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(rename = "type", default)]
    pub anomaly_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Header counters as computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    #[serde(default)]
    pub devices: Option<u64>,
    #[serde(default)]
    pub traffic_rate: Option<String>,
    #[serde(default)]
    pub alert_count: Option<u64>,
    #[serde(default)]
    pub anomaly_count: Option<u64>,
}

/// Protocol name -> share in percent, in backend order.
pub type ProtocolShares = IndexMap<String, f64>;

/// Response of `GET /api/network/overview`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    #[serde(default)]
    pub stats: OverviewStats,
    #[serde(default)]
    pub traffic_data: Vec<TrafficSample>,
    #[serde(default)]
    pub protocol_distribution: ProtocolShares,
    #[serde(default)]
    pub top_talkers: Vec<WireTopTalker>,
    #[serde(default)]
    pub recent_anomalies: Vec<WireAnomaly>,
    #[serde(default)]
    pub devices: Vec<WireDevice>,
}

/// Payload of the `network_update` stream event. Absent fields mean
/// "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkUpdate {
    #[serde(default)]
    pub traffic_data: Option<Vec<TrafficSample>>,
    #[serde(default)]
    pub protocol_distribution: Option<ProtocolShares>,
    #[serde(default)]
    pub top_talkers: Option<Vec<WireTopTalker>>,
    #[serde(default)]
    pub devices: Option<Vec<WireDevice>>,
    #[serde(default)]
    pub anomalies: Option<Vec<WireAnomaly>>,
}

// ── Auth ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "agreePolicy")]
    pub agree_policy: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}

/// Error body shape shared by every endpoint: `{"message": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
