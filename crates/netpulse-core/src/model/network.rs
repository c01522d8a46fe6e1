// ── Traffic, device and talker domain types ──

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One traffic sample, in Mbps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficPoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}

/// A host seen on the network. Identity is `ip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip: String,
    /// Peer IPs this device has exchanged traffic with.
    pub connections: Vec<String>,
    pub anomalous: bool,
    pub inbound: f64,
    pub outbound: f64,
    pub total: f64,
}

/// A device ranked by combined inbound + outbound volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTalker {
    pub ip: String,
    pub name: String,
    pub inbound: f64,
    pub outbound: f64,
    pub total: f64,
    pub is_anomalous: bool,
}

/// Protocol name -> share of traffic in percent, in backend order.
pub type ProtocolDistribution = IndexMap<String, f64>;

/// Sort talkers by total volume, busiest first.
pub fn rank_talkers(talkers: &mut [TopTalker]) {
    talkers.sort_by(|a, b| b.total.total_cmp(&a.total));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talker(ip: &str, total: f64) -> TopTalker {
        TopTalker {
            ip: ip.into(),
            name: ip.into(),
            inbound: 0.0,
            outbound: 0.0,
            total,
            is_anomalous: false,
        }
    }

    #[test]
    fn ranks_by_total_descending() {
        let mut talkers = vec![talker("a", 1.0), talker("b", 9.0), talker("c", 4.5)];
        rank_talkers(&mut talkers);
        let order: Vec<_> = talkers.iter().map(|t| t.ip.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
    }
}
