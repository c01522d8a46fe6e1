// ── Dashboard view model ──

use serde::{Deserialize, Serialize};

use super::anomaly::Anomaly;
use super::network::{Device, ProtocolDistribution, TopTalker, TrafficPoint};

/// Traffic series length cap.
pub const TRAFFIC_CAP: usize = 1000;
/// Anomaly and alert window cap.
pub const ANOMALY_CAP: usize = 100;

/// Header counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub devices: usize,
    pub traffic_rate: String,
    pub alert_count: u64,
    pub anomaly_count: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            devices: 0,
            traffic_rate: "0 Mbps".into(),
            alert_count: 0,
            anomaly_count: 0,
        }
    }
}

/// Render a traffic value the way the header shows it.
pub fn format_rate(mbps: f64) -> String {
    format!("{mbps:.2} Mbps")
}

/// Everything the dashboard renders, minus alert acknowledgement state.
///
/// Produced by [`crate::reducer`]; never mutated in place by consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub stats: Stats,
    pub traffic: Vec<TrafficPoint>,
    pub protocols: ProtocolDistribution,
    pub top_talkers: Vec<TopTalker>,
    pub anomalies: Vec<Anomaly>,
    pub devices: Vec<Device>,
}

impl ViewModel {
    pub fn latest_traffic(&self) -> Option<&TrafficPoint> {
        self.traffic.last()
    }

    pub fn device(&self, ip: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.ip == ip)
    }

    pub fn is_empty(&self) -> bool {
        self.traffic.is_empty() && self.devices.is_empty() && self.anomalies.is_empty()
    }
}

/// Whether the dashboard is live, and why not.
///
/// `is_connected` holds only while the snapshot fetch has succeeded and the
/// stream has not reported an error since.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub last_error: Option<String>,
    /// The backend refused the session token; the login view should be
    /// shown.
    #[serde(default)]
    pub auth_expired: bool,
}

impl ConnectionState {
    pub fn connected() -> Self {
        Self {
            is_connected: true,
            last_error: None,
            auth_expired: false,
        }
    }

    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            is_connected: false,
            last_error: Some(error.into()),
            auth_expired: false,
        }
    }
}
