// ── API-to-domain type conversions ──
//
// Bridges raw `netpulse_api` wire types into canonical `netpulse_core::model`
// types. Every missing optional field gets its default here, so the reducer
// only ever sees fully populated values.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use netpulse_api::StreamEvent;
use netpulse_api::types::{
    NetworkUpdate, Overview, OverviewStats, TrafficSample, WireAnomaly, WireDevice, WireTopTalker,
};

use crate::model::{Anomaly, AnomalyId, Device, Severity, TopTalker, TrafficPoint};
use crate::reducer::{Delta, ReportedStats, Snapshot};

const UNKNOWN_DEVICE_TYPE: &str = "unknown";

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an ISO-8601 timestamp. Offset-less values (what the backend's
/// `isoformat()` produces) are taken as UTC.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_severity(raw: Option<&str>) -> Severity {
    match raw {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::debug!(severity = s, "unknown severity, treating as low");
            Severity::Low
        }),
        None => Severity::Low,
    }
}

fn name_or_ip(name: Option<String>, ip: &str) -> String {
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| ip.to_owned())
}

// ── Network data ───────────────────────────────────────────────────

impl From<TrafficSample> for TrafficPoint {
    fn from(sample: TrafficSample) -> Self {
        Self {
            timestamp: parse_timestamp(sample.timestamp.as_deref()),
            value: sample.value,
        }
    }
}

impl From<WireDevice> for Device {
    fn from(d: WireDevice) -> Self {
        let name = name_or_ip(d.name, &d.ip);
        Self {
            id: d.id.map_or_else(|| d.ip.clone(), |id| id.to_string()),
            name,
            kind: d
                .device_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE_TYPE.to_owned()),
            connections: d.connections.unwrap_or_default(),
            anomalous: d.anomalous.unwrap_or(false),
            inbound: d.inbound.unwrap_or(0.0),
            outbound: d.outbound.unwrap_or(0.0),
            total: d.total.unwrap_or(0.0),
            ip: d.ip,
        }
    }
}

impl From<WireTopTalker> for TopTalker {
    fn from(t: WireTopTalker) -> Self {
        let name = name_or_ip(t.name, &t.ip);
        Self {
            name,
            inbound: t.inbound.unwrap_or(0.0),
            outbound: t.outbound.unwrap_or(0.0),
            total: t.total.unwrap_or(0.0),
            is_anomalous: t.is_anomalous.unwrap_or(false),
            ip: t.ip,
        }
    }
}

/// Anomalies without an id get one derived from the fields the backend did
/// send, so re-fetching the same record maps onto the same alert.
fn derived_id(a: &WireAnomaly) -> AnomalyId {
    let key = [
        a.timestamp.as_deref(),
        a.anomaly_type.as_deref(),
        a.severity.as_deref(),
        a.source.as_deref(),
        a.description.as_deref(),
    ]
    .map(Option::unwrap_or_default)
    .join("\u{1f}");
    AnomalyId::new(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
}

impl From<WireAnomaly> for Anomaly {
    fn from(a: WireAnomaly) -> Self {
        Self {
            id: match a.id {
                Some(ref id) => AnomalyId::new(id.to_string()),
                None => derived_id(&a),
            },
            timestamp: parse_timestamp(a.timestamp.as_deref()),
            severity: parse_severity(a.severity.as_deref()),
            kind: a.anomaly_type.unwrap_or_else(|| "Anomaly".to_owned()),
            source: a.source.unwrap_or_default(),
            score: a.score.unwrap_or(0.0).clamp(0.0, 100.0),
            description: a.description,
        }
    }
}

fn convert_all<W, D: From<W>>(items: Vec<W>) -> Vec<D> {
    items.into_iter().map(D::from).collect()
}

// ── Snapshots and deltas ───────────────────────────────────────────

impl From<OverviewStats> for ReportedStats {
    fn from(s: OverviewStats) -> Self {
        Self {
            devices: s.devices.and_then(|n| usize::try_from(n).ok()),
            traffic_rate: s.traffic_rate,
            alert_count: s.alert_count,
            anomaly_count: s.anomaly_count,
        }
    }
}

impl From<Overview> for Snapshot {
    fn from(o: Overview) -> Self {
        Self {
            stats: o.stats.into(),
            traffic: convert_all(o.traffic_data),
            protocols: o.protocol_distribution,
            top_talkers: convert_all(o.top_talkers),
            anomalies: convert_all(o.recent_anomalies),
            devices: convert_all(o.devices),
        }
    }
}

impl From<NetworkUpdate> for Delta {
    fn from(u: NetworkUpdate) -> Self {
        Self {
            traffic: u.traffic_data.map(convert_all).unwrap_or_default(),
            devices: u.devices.map(convert_all),
            top_talkers: u.top_talkers.map(convert_all),
            protocols: u.protocol_distribution,
            anomalies: u.anomalies.map(convert_all).unwrap_or_default(),
        }
    }
}

impl From<&StreamEvent> for Delta {
    fn from(event: &StreamEvent) -> Self {
        match event {
            StreamEvent::NetworkUpdate(update) => Self::from(update.clone()),
            StreamEvent::NewAnomalies(batch) => Self {
                anomalies: convert_all(batch.clone()),
                ..Self::default()
            },
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
