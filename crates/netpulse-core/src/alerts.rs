// ── Alert acknowledgement store ──
//
// Alerts are derived 1:1 from anomalies the first time an id is seen. The
// acknowledged flag belongs to the user: re-delivered anomalies are
// suppressed by id, so nothing coming from the backend can reset it.

use serde::{Deserialize, Serialize};

use crate::model::{ANOMALY_CAP, Alert, Anomaly, AnomalyId};

/// Bounded, insertion-ordered alert list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStore {
    alerts: Vec<Alert>,
}

/// List filter: case-insensitive substring over title and description,
/// plus an acknowledged-visibility toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFilter {
    pub query: String,
    pub show_acknowledged: bool,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            show_acknowledged: true,
        }
    }
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        if !self.show_acknowledged && alert.acknowledged {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        alert.title.to_lowercase().contains(&needle)
            || alert.description.to_lowercase().contains(&needle)
    }
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an alert acknowledged. Returns `true` only if the flag changed;
    /// unknown ids and already-acknowledged alerts are a no-op.
    pub fn acknowledge(&mut self, id: &AnomalyId) -> bool {
        match self.alerts.iter_mut().find(|a| &a.id == id) {
            Some(alert) if !alert.acknowledged => {
                alert.acknowledged = true;
                true
            }
            _ => false,
        }
    }

    /// Build the alert for an anomaly, or `None` if one with the same id
    /// already exists.
    pub fn derive_from_anomaly(&self, anomaly: &Anomaly) -> Option<Alert> {
        if self.contains(&anomaly.id) {
            None
        } else {
            Some(Alert::from(anomaly))
        }
    }

    /// Derive and append alerts for every unseen anomaly, then trim to the
    /// newest [`ANOMALY_CAP`]. A re-delivered id moves its existing alert,
    /// acknowledged flag included, to the newest end so it is evicted no
    /// earlier than the anomaly itself. Returns the number of alerts added.
    pub fn ingest<'a>(&mut self, anomalies: impl IntoIterator<Item = &'a Anomaly>) -> usize {
        let mut added = 0;
        for anomaly in anomalies {
            match self.alerts.iter().position(|a| a.id == anomaly.id) {
                Some(pos) => {
                    let existing = self.alerts.remove(pos);
                    self.alerts.push(existing);
                }
                None => {
                    self.alerts.push(Alert::from(anomaly));
                    added += 1;
                }
            }
        }
        if self.alerts.len() > ANOMALY_CAP {
            let excess = self.alerts.len() - ANOMALY_CAP;
            self.alerts.drain(..excess);
        }
        added
    }

    pub fn contains(&self, id: &AnomalyId) -> bool {
        self.alerts.iter().any(|a| &a.id == id)
    }

    pub fn get(&self, id: &AnomalyId) -> Option<&Alert> {
        self.alerts.iter().find(|a| &a.id == id)
    }

    pub fn unacknowledged_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    /// Oldest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn filter<'a>(&'a self, filter: &'a AlertFilter) -> impl Iterator<Item = &'a Alert> + 'a {
        self.alerts.iter().filter(move |a| filter.matches(a))
    }

    /// Newest unacknowledged alerts first, at most `limit`.
    pub fn pending(&self, limit: usize) -> impl Iterator<Item = &Alert> {
        self.alerts
            .iter()
            .rev()
            .filter(|a| !a.acknowledged)
            .take(limit)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
