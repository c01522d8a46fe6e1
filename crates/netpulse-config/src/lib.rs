//! Shared configuration for the netpulse CLI and TUI.
//!
//! TOML profiles, base URL and token resolution (flag, env, keyring,
//! plaintext) and translation to `netpulse_core::MonitorConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use netpulse_core::{DEFAULT_API_URL, MonitorConfig, TlsMode};

/// Keyring service name for stored session tokens.
const KEYRING_SERVICE: &str = "netpulse";

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "NETPULSE_CONFIG";
/// Selects the backend base URL ahead of any profile.
pub const API_URL_ENV: &str = "NETPULSE_API_URL";
/// Disables the system keyring when set to anything but `0`/empty.
pub const NO_KEYRING_ENV: &str = "NETPULSE_NO_KEYRING";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Merge throttle window for the live stream, in milliseconds.
    #[serde(default = "default_stream_window")]
    pub stream_window_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            stream_window_ms: default_stream_window(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_stream_window() -> u64 {
    100
}

/// A named backend profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g. "http://localhost:5000").
    pub api_url: Option<String>,

    /// Account email, remembered for the next login prompt.
    pub email: Option<String>,

    /// Session token (plaintext, only when the keyring is unavailable).
    pub token: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,
}

impl Config {
    /// Name of the active profile: the flag, else `default_profile`, else
    /// `"default"`.
    pub fn profile_name(&self, flag: Option<&str>) -> String {
        flag.map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn profile_mut(&mut self, name: &str) -> &mut Profile {
        self.profiles.entry(name.to_owned()).or_default()
    }

    /// Set a dotted key such as `defaults.output` or
    /// `profiles.home.api_url` from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["default_profile"] => self.default_profile = Some(value.to_owned()),
            ["defaults", "output"] => {
                self.defaults.output =
                    one_of(key, value, &["table", "json", "json-compact", "yaml", "plain"])?;
            }
            ["defaults", "color"] => {
                self.defaults.color = one_of(key, value, &["auto", "always", "never"])?;
            }
            ["defaults", "timeout"] => self.defaults.timeout = parse_u64(key, value)?,
            ["defaults", "stream_window_ms"] => {
                self.defaults.stream_window_ms = parse_u64(key, value)?;
            }
            ["profiles", name, field] => {
                if !PROFILE_KEYS.contains(field) {
                    return Err(ConfigError::UnknownKey { key: key.into() });
                }
                let profile = self.profile_mut(name);
                match *field {
                    "api_url" => {
                        url::Url::parse(value).map_err(|e| ConfigError::Validation {
                            field: key.into(),
                            reason: format!("invalid URL: {e}"),
                        })?;
                        profile.api_url = Some(value.to_owned());
                    }
                    "email" => profile.email = Some(value.to_owned()),
                    "timeout" => profile.timeout = Some(parse_u64(key, value)?),
                    "insecure" => {
                        profile.insecure =
                            Some(value.parse().map_err(|_| ConfigError::Validation {
                                field: key.into(),
                                reason: format!("expected true or false, got '{value}'"),
                            })?);
                    }
                    _ => return Err(ConfigError::UnknownKey { key: key.into() }),
                }
            }
            _ => return Err(ConfigError::UnknownKey { key: key.into() }),
        }
        Ok(())
    }
}

const PROFILE_KEYS: [&str; 4] = ["api_url", "email", "timeout", "insecure"];

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Validation {
        field: key.into(),
        reason: format!("expected a non-negative integer, got '{value}'"),
    })
}

fn one_of(key: &str, value: &str, allowed: &[&str]) -> Result<String, ConfigError> {
    if allowed.contains(&value) {
        Ok(value.to_owned())
    } else {
        Err(ConfigError::Validation {
            field: key.into(),
            reason: format!("expected one of {}, got '{value}'", allowed.join(", ")),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `NETPULSE_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("", "", "netpulse").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netpulse");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load `path` layered over defaults, with `NETPULSE_*` variables on top
/// (`NETPULSE_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("NETPULSE_")
                .ignore(&["api_url", "token", "config", "no_keyring"])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it is missing or unreadable.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        debug!(error = %e, "using default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Base URL ────────────────────────────────────────────────────────

/// Resolve the backend URL: flag → `NETPULSE_API_URL` → profile → default.
pub fn resolve_api_url(flag: Option<&str>, profile: Option<&Profile>) -> String {
    let env = std::env::var(API_URL_ENV).ok();
    resolve_api_url_with(flag, env.as_deref(), profile)
}

fn resolve_api_url_with(flag: Option<&str>, env: Option<&str>, profile: Option<&Profile>) -> String {
    flag.filter(|s| !s.is_empty())
        .or_else(|| env.filter(|s| !s.is_empty()))
        .or_else(|| profile.and_then(|p| p.api_url.as_deref()))
        .unwrap_or(DEFAULT_API_URL)
        .to_owned()
}

// ── Token storage ───────────────────────────────────────────────────

/// Where `store_token` put the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStorage {
    Keyring,
    Plaintext,
}

fn keyring_enabled() -> bool {
    !matches!(std::env::var(NO_KEYRING_ENV), Ok(v) if !v.is_empty() && v != "0")
}

fn keyring_entry(profile_name: &str) -> Option<keyring::Entry> {
    if !keyring_enabled() {
        return None;
    }
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
        .inspect_err(|e| debug!(error = %e, "keyring unavailable"))
        .ok()
}

/// Resolve the session token: flag (or `NETPULSE_TOKEN`, handled by the
/// CLI parser) → keyring → profile plaintext.
pub fn resolve_token(
    flag: Option<SecretString>,
    profile: Option<&Profile>,
    profile_name: &str,
) -> Option<SecretString> {
    if let Some(token) = flag {
        return Some(token);
    }

    if let Some(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    profile
        .and_then(|p| p.token.clone())
        .map(SecretString::from)
}

/// Persist a token for `profile_name`. Tries the keyring first, falling
/// back to plaintext in `cfg`. The caller saves `cfg` afterwards.
pub fn store_token(cfg: &mut Config, profile_name: &str, token: &SecretString) -> TokenStorage {
    if let Some(entry) = keyring_entry(profile_name) {
        match entry.set_password(token.expose_secret()) {
            Ok(()) => {
                cfg.profile_mut(profile_name).token = None;
                return TokenStorage::Keyring;
            }
            Err(e) => warn!(error = %e, "keyring write failed, storing token in config file"),
        }
    }
    cfg.profile_mut(profile_name).token = Some(token.expose_secret().to_owned());
    TokenStorage::Plaintext
}

/// Forget the token for `profile_name` in both the keyring and `cfg`.
/// Returns whether `cfg` changed.
pub fn clear_token(cfg: &mut Config, profile_name: &str) -> bool {
    if let Some(entry) = keyring_entry(profile_name) {
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => warn!(error = %e, "failed to remove token from keyring"),
        }
    }
    cfg.profiles
        .get_mut(profile_name)
        .and_then(|p| p.token.take())
        .is_some()
}

// ── MonitorConfig ───────────────────────────────────────────────────

/// Build a `MonitorConfig` for `profile_name`. `api_url` and `timeout`
/// are flag overrides; `token` is the already-resolved credential.
pub fn monitor_config(
    cfg: &Config,
    profile_name: &str,
    api_url: Option<&str>,
    token: Option<SecretString>,
    timeout: Option<u64>,
) -> Result<MonitorConfig, ConfigError> {
    let profile = cfg.profile(profile_name);
    let raw = resolve_api_url(api_url, profile);
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;

    let mut config = MonitorConfig::new(url).with_timeout(Duration::from_secs(
        timeout
            .or_else(|| profile.and_then(|p| p.timeout))
            .unwrap_or(cfg.defaults.timeout),
    ));
    config.merge_window = Duration::from_millis(cfg.defaults.stream_window_ms);
    if profile.and_then(|p| p.insecure).unwrap_or(false) {
        config.tls = TlsMode::DangerAcceptInvalid;
    }
    config.token = token;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn profile(url: &str) -> Profile {
        Profile {
            api_url: Some(url.into()),
            ..Profile::default()
        }
    }

    #[test]
    fn api_url_precedence() {
        let p = profile("http://profile:5000");
        assert_eq!(
            resolve_api_url_with(Some("http://flag:1"), Some("http://env:2"), Some(&p)),
            "http://flag:1"
        );
        assert_eq!(
            resolve_api_url_with(None, Some("http://env:2"), Some(&p)),
            "http://env:2"
        );
        assert_eq!(
            resolve_api_url_with(None, None, Some(&p)),
            "http://profile:5000"
        );
        assert_eq!(resolve_api_url_with(None, Some(""), None), DEFAULT_API_URL);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults, Defaults::default());
        assert_eq!(cfg.profile_name(None), "default");
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut cfg = Config::default();
        cfg.set("profiles.lab.api_url", "http://10.0.0.9:5000").unwrap();
        cfg.set("profiles.lab.email", "ops@example.com").unwrap();
        cfg.set("defaults.stream_window_ms", "250").unwrap();
        cfg.set("default_profile", "lab").unwrap();
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profile_name(None), "lab");
        assert_eq!(loaded.defaults.stream_window_ms, 250);
        assert_eq!(
            loaded.profile("lab").unwrap().email.as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("defaults.output", "xml"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            cfg.set("defaults.timeout", "-1"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            cfg.set("profiles.x.colour", "red"),
            Err(ConfigError::UnknownKey { .. })
        ));
        assert!(matches!(
            cfg.set("nope", "1"),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn flag_token_wins_over_plaintext() {
        let p = Profile {
            token: Some("stored".into()),
            ..Profile::default()
        };
        let token = resolve_token(Some(SecretString::from("flag".to_owned())), Some(&p), "t");
        assert_eq!(token.unwrap().expose_secret(), "flag");
    }

    #[test]
    fn monitor_config_applies_profile_and_defaults() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                api_url: Some("http://10.0.0.9:5000".into()),
                timeout: Some(5),
                insecure: Some(true),
                ..Profile::default()
            },
        );
        cfg.defaults.stream_window_ms = 40;

        let mc = monitor_config(&cfg, "lab", Some("http://127.0.0.1:8080"), None, None).unwrap();
        assert_eq!(mc.base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(mc.timeout, Duration::from_secs(5));
        assert_eq!(mc.merge_window, Duration::from_millis(40));
        assert_eq!(mc.tls, TlsMode::DangerAcceptInvalid);
        assert!(mc.token.is_none());

        let mc = monitor_config(&cfg, "lab", Some("http://127.0.0.1:8080"), None, Some(9)).unwrap();
        assert_eq!(mc.timeout, Duration::from_secs(9));
    }

    #[test]
    fn monitor_config_rejects_bad_url() {
        let cfg = Config::default();
        let err = monitor_config(&cfg, "default", Some("::nope"), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
