// HTTP client for the netpulse backend.
//
// Wraps `reqwest::Client` with base-URL joining, bearer auth and uniform
// response handling. Endpoint groups (auth, network) are implemented as
// inherent methods in their own modules to keep this file focused on
// transport mechanics.

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::ErrorBody;

/// Async client for the backend's `/api/...` endpoints.
///
/// A client built with [`with_token`](Self::with_token) attaches
/// `Authorization: Bearer <token>` to every request. An anonymous client
/// can only use the login/signup/reset endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    transport: TransportConfig,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Anonymous client, used before a session token exists.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.http_client(None)?,
            base_url: Self::normalize_base_url(base_url)?,
            token: None,
            transport: transport.clone(),
        })
    }

    /// Authenticated client.
    pub fn with_token(
        base_url: &str,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.http_client(Some(token))?,
            base_url: Self::normalize_base_url(base_url)?,
            token: Some(token.clone()),
            transport: transport.clone(),
        })
    }

    /// Same backend, new credential. Used right after login/signup.
    pub fn authenticated(&self, token: &SecretString) -> Result<Self, Error> {
        Self::with_token(self.base_url.as_str(), token, &self.transport)
    }

    /// Base URL always ends with `/` so relative joins keep any path prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn require_token(&self) -> Result<(), Error> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(Error::MissingToken)
        }
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"api/network/overview"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await.map_err(self.map_send())?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(self.map_send())?;
        self.handle_response(resp).await
    }

    /// Bodyless GET where only the status matters.
    pub(crate) async fn get_status(&self, path: &str) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        self.http.get(url).send().await.map_err(self.map_send())
    }

    /// POST a JSON body and return the raw response for endpoint-specific
    /// status handling.
    pub(crate) async fn post_raw<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let mut req = self.http.post(url);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(self.map_send())
    }

    fn map_send(&self) -> impl Fn(reqwest::Error) -> Error + '_ {
        move |e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.transport.timeout.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        }
    }

    // ── Response handling ────────────────────────────────────────────

    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            parse_body(body)
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    /// Map a failed network-endpoint response. 401/403 means the bearer
    /// token is no longer accepted.
    pub(crate) async fn parse_error(
        &self,
        status: reqwest::StatusCode,
        resp: reqwest::Response,
    ) -> Error {
        if matches!(
            status,
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        ) {
            return Error::SessionExpired;
        }

        Error::Api {
            status: status.as_u16(),
            message: error_message(status, resp).await,
        }
    }
}

/// Deserialize a success body, keeping a preview for diagnostics.
pub(crate) fn parse_body<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Extract `{"message": ...}` from an error body, falling back to the raw
/// text and finally the status line.
pub(crate) async fn error_message(status: reqwest::StatusCode, resp: reqwest::Response) -> String {
    let raw = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ if raw.trim().is_empty() => status.to_string(),
        _ => raw,
    }
}
