// ── Runtime monitor configuration ──
//
// Describes *how* to reach a backend: URL, credential and connection
// tuning. Never touches disk; the CLI/TUI resolve profiles and hand a
// finished `MonitorConfig` in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use netpulse_api::{ApiClient, ReconnectConfig, TlsMode, TransportConfig};

use crate::error::CoreError;

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Minimum spacing between two merges of stream updates.
pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Backend URL (e.g. `http://localhost:5000`).
    pub base_url: Url,
    /// Session token. Without one the live stream is never started.
    pub token: Option<SecretString>,
    pub tls: TlsMode,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Throttle window for stream merges.
    pub merge_window: Duration,
    pub reconnect: ReconnectConfig,
    /// Open the Socket.IO stream on connect. Off for one-shot CLI calls.
    pub stream_enabled: bool,
}

impl MonitorConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
            merge_window: DEFAULT_MERGE_WINDOW,
            reconnect: ReconnectConfig::default(),
            stream_enabled: true,
        }
    }

    /// Parse `raw` as the base URL.
    pub fn from_url(raw: &str) -> Result<Self, CoreError> {
        let url = Url::parse(raw).map_err(|e| CoreError::Config {
            message: format!("invalid API URL '{raw}': {e}"),
        })?;
        Ok(Self::new(url))
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls,
            timeout: self.timeout,
        }
    }

    /// REST client for this backend, authenticated if a token is set.
    pub fn client(&self) -> Result<ApiClient, CoreError> {
        let transport = self.transport();
        let client = match &self.token {
            Some(token) => ApiClient::with_token(self.base_url.as_str(), token, &transport)?,
            None => ApiClient::new(self.base_url.as_str(), &transport)?,
        };
        Ok(client)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = MonitorConfig::from_url(DEFAULT_API_URL).unwrap();
        assert_eq!(cfg.merge_window, Duration::from_millis(100));
        assert!(cfg.stream_enabled);
        assert!(cfg.token.is_none());
        assert!(!cfg.client().unwrap().has_token());
    }

    #[test]
    fn bad_url_is_a_config_error() {
        let err = MonitorConfig::from_url("not a url").unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn token_makes_an_authenticated_client() {
        let cfg = MonitorConfig::from_url("http://10.0.0.2:5000")
            .unwrap()
            .with_token(SecretString::from("abc".to_owned()));
        assert!(cfg.client().unwrap().has_token());
    }
}
