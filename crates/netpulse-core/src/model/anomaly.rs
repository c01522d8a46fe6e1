// ── Anomaly and alert domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

// ── AnomalyId ───────────────────────────────────────────────────────

/// Identifier shared by an anomaly and the alert derived from it.
///
/// The backend sends integers; other deployments send strings. Both are
/// normalized to their textual form so `1` and `"1"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyId(String);

impl AnomalyId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnomalyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnomalyId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for AnomalyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for AnomalyId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// ── Severity ────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Medium and high anomalies count toward the alert counter.
    pub fn is_alerting(self) -> bool {
        matches!(self, Self::Medium | Self::High)
    }
}

// ── Anomaly ─────────────────────────────────────────────────────────

/// A backend-flagged deviation in traffic behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub timestamp: Option<DateTime<Utc>>,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    /// 0-100.
    pub score: f64,
    pub description: Option<String>,
}

// ── Alert ───────────────────────────────────────────────────────────

/// Client-side, acknowledgeable wrapper around an anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AnomalyId,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: Option<DateTime<Utc>>,
    pub acknowledged: bool,
}

impl From<&Anomaly> for Alert {
    fn from(anomaly: &Anomaly) -> Self {
        let description = anomaly
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Detected from {}", anomaly.source));

        Self {
            id: anomaly.id.clone(),
            title: anomaly.kind.clone(),
            description,
            severity: anomaly.severity,
            timestamp: anomaly.timestamp,
            acknowledged: false,
        }
    }
}
