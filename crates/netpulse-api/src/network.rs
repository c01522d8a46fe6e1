// Network data endpoints
//
// Read-only views over the backend's capture state. All require a bearer
// token.

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{Overview, TrafficSample, WireAnomaly, WireDevice, WireTopTalker};

/// Query options for [`ApiClient::anomalies`].
#[derive(Debug, Clone, Default)]
pub struct AnomalyQuery {
    /// Look-back window in hours.
    pub hours: u32,
    /// Only return anomalies of this severity (`low`, `medium`, `high`).
    pub severity: Option<String>,
}

impl AnomalyQuery {
    pub fn new(hours: u32) -> Self {
        Self {
            hours,
            severity: None,
        }
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("hours", self.hours.to_string())];
        if let Some(ref severity) = self.severity {
            params.push(("severity", severity.clone()));
        }
        params
    }
}

impl ApiClient {
    /// Full dashboard snapshot.
    pub async fn overview(&self) -> Result<Overview, Error> {
        self.require_token()?;
        self.get("api/network/overview").await
    }

    /// Traffic samples from the last `hours`.
    pub async fn traffic(&self, hours: u32) -> Result<Vec<TrafficSample>, Error> {
        self.require_token()?;
        self.get_with_params("api/network/traffic", &[("hours", hours.to_string())])
            .await
    }

    pub async fn anomalies(&self, query: &AnomalyQuery) -> Result<Vec<WireAnomaly>, Error> {
        self.require_token()?;
        self.get_with_params("api/network/anomalies", &query.params())
            .await
    }

    pub async fn devices(&self) -> Result<Vec<WireDevice>, Error> {
        self.require_token()?;
        self.get("api/network/devices").await
    }

    pub async fn top_talkers(&self) -> Result<Vec<WireTopTalker>, Error> {
        self.require_token()?;
        self.get("api/network/top-talkers").await
    }
}
