// ── View-model reducer ──
//
// Pure functions from (previous view, input) to next view. Nothing here
// touches channels, clocks or the network, which keeps every merge rule
// testable in isolation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{
    ANOMALY_CAP, Anomaly, AnomalyId, Device, ProtocolDistribution, Stats, TRAFFIC_CAP, TopTalker,
    TrafficPoint, ViewModel, format_rate,
};

// ── Inputs ──────────────────────────────────────────────────────────

/// Incremental update from the stream. `None` / empty means "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub traffic: Vec<TrafficPoint>,
    pub devices: Option<Vec<Device>>,
    pub top_talkers: Option<Vec<TopTalker>>,
    pub protocols: Option<ProtocolDistribution>,
    pub anomalies: Vec<Anomaly>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.traffic.is_empty()
            && self.devices.is_none()
            && self.top_talkers.is_none()
            && self.protocols.is_none()
            && self.anomalies.is_empty()
    }

    /// Fold a later delta into this one. Traffic points and anomaly
    /// batches accumulate in arrival order; every other field is last
    /// write wins.
    pub fn absorb(&mut self, later: Self) {
        self.traffic.extend(later.traffic);
        keep_last(&mut self.traffic, TRAFFIC_CAP);
        if later.devices.is_some() {
            self.devices = later.devices;
        }
        if later.top_talkers.is_some() {
            self.top_talkers = later.top_talkers;
        }
        if later.protocols.is_some() {
            self.protocols = later.protocols;
        }
        self.anomalies.extend(later.anomalies);
    }
}

/// Counters as reported by the backend in a snapshot. Absent values are
/// recomputed from the snapshot's own collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportedStats {
    pub devices: Option<usize>,
    pub traffic_rate: Option<String>,
    pub alert_count: Option<u64>,
    pub anomaly_count: Option<u64>,
}

/// Full state from the overview endpoint, already converted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub stats: ReportedStats,
    pub traffic: Vec<TrafficPoint>,
    pub protocols: ProtocolDistribution,
    pub top_talkers: Vec<TopTalker>,
    pub anomalies: Vec<Anomaly>,
    pub devices: Vec<Device>,
}

// ── Merge ───────────────────────────────────────────────────────────

/// Apply a stream delta to the previous view.
///
/// Rules, per field:
/// - traffic is appended and trimmed to the last [`TRAFFIC_CAP`] points
/// - devices, top talkers and protocols are replaced when supplied
/// - anomalies with an unseen id are appended, trimmed to [`ANOMALY_CAP`]
/// - counters move only for newly accepted anomalies
pub fn merge(prev: &ViewModel, delta: &Delta) -> ViewModel {
    merge_reporting(prev, delta).0
}

/// [`merge`], also returning the anomalies the view accepted: the delta's
/// batch minus ids already present and repeats within the batch.
pub fn merge_reporting(prev: &ViewModel, delta: &Delta) -> (ViewModel, Vec<Anomaly>) {
    let mut next = prev.clone();

    if !delta.traffic.is_empty() {
        next.traffic.extend_from_slice(&delta.traffic);
        keep_last(&mut next.traffic, TRAFFIC_CAP);
    }
    if let Some(ref devices) = delta.devices {
        next.devices.clone_from(devices);
    }
    if let Some(ref talkers) = delta.top_talkers {
        next.top_talkers.clone_from(talkers);
    }
    if let Some(ref protocols) = delta.protocols {
        next.protocols.clone_from(protocols);
    }

    let accepted = append_unique(&mut next.anomalies, &delta.anomalies);
    keep_last(&mut next.anomalies, ANOMALY_CAP);

    next.stats.devices = next.devices.len();
    if let Some(last) = delta.traffic.last() {
        next.stats.traffic_rate = format_rate(last.value);
    }
    next.stats.anomaly_count += count(accepted.len());
    next.stats.alert_count += count(
        accepted
            .iter()
            .filter(|a| a.severity.is_alerting())
            .count(),
    );

    let accepted = accepted.into_iter().cloned().collect();
    (next, accepted)
}

/// Build a fresh view from a snapshot, discarding the previous one.
///
/// The same caps and id uniqueness apply as for merges.
pub fn replace(snapshot: Snapshot) -> ViewModel {
    let Snapshot {
        stats: reported,
        mut traffic,
        protocols,
        top_talkers,
        anomalies: incoming,
        devices,
    } = snapshot;

    keep_last(&mut traffic, TRAFFIC_CAP);

    let mut anomalies = Vec::with_capacity(incoming.len().min(ANOMALY_CAP));
    append_unique(&mut anomalies, &incoming);
    keep_last(&mut anomalies, ANOMALY_CAP);

    let stats = Stats {
        devices: reported.devices.unwrap_or(devices.len()),
        traffic_rate: reported.traffic_rate.unwrap_or_else(|| {
            traffic
                .last()
                .map_or_else(|| Stats::default().traffic_rate, |p| format_rate(p.value))
        }),
        alert_count: reported.alert_count.unwrap_or_else(|| {
            count(
                anomalies
                    .iter()
                    .filter(|a| a.severity.is_alerting())
                    .count(),
            )
        }),
        anomaly_count: reported
            .anomaly_count
            .unwrap_or_else(|| count(anomalies.len())),
    };

    ViewModel {
        stats,
        traffic,
        protocols,
        top_talkers,
        anomalies,
        devices,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Append anomalies whose id is not yet in `existing` (nor earlier in the
/// same batch). Returns the accepted ones.
fn append_unique<'a>(existing: &mut Vec<Anomaly>, incoming: &'a [Anomaly]) -> Vec<&'a Anomaly> {
    let mut seen: HashSet<AnomalyId> = existing.iter().map(|a| a.id.clone()).collect();
    let accepted: Vec<&Anomaly> = incoming
        .iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();
    existing.extend(accepted.iter().map(|a| (*a).clone()));
    accepted
}

/// Drop from the head until at most `cap` items remain.
fn keep_last<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        let excess = items.len() - cap;
        items.drain(..excess);
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

// ── Tests ───────────────────────────────────────────────────────────
