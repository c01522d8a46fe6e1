//! Integration tests for the `netpulse` CLI binary.
//!
//! Argument parsing and config handling run offline; data and auth
//! commands run against a wiremock backend. Every invocation gets its own
//! config file and never touches the OS keyring.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Seed the config with a logged-in default profile.
    fn with_session(self, api_url: &str, token: &str) -> Self {
        let text = format!(
            "default_profile = \"default\"\n\n[profiles.default]\napi_url = \"{api_url}\"\nemail = \"ops@example.com\"\ntoken = \"{token}\"\n"
        );
        std::fs::write(self.config_path(), text).unwrap();
        self
    }

    fn config_text(&self) -> String {
        std::fs::read_to_string(self.config_path()).unwrap_or_default()
    }

    /// `netpulse` with env isolation: a private config file, no keyring and
    /// none of the `NETPULSE_*` overrides from the calling shell.
    fn cmd(&self) -> assert_cmd::Command {
        isolated(&self.config_path())
    }
}

fn isolated(config: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netpulse");
    cmd.env("NETPULSE_CONFIG", config)
        .env("NETPULSE_NO_KEYRING", "1")
        .env_remove("NETPULSE_API_URL")
        .env_remove("NETPULSE_TOKEN")
        .env_remove("NETPULSE_PROFILE")
        .env_remove("NETPULSE_OUTPUT")
        .env_remove("NETPULSE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn overview_body() -> Value {
    json!({
        "stats": {"devices": 2, "traffic_rate": "12.4 Mbps"},
        "traffic_data": [{"timestamp": "2026-10-18T09:00:00Z", "value": 12.4}],
        "protocol_distribution": {"TCP": 70.0, "UDP": 30.0},
        "top_talkers": [{"ip": "10.0.0.5", "total": 120.0}],
        "recent_anomalies": [
            {"id": 1, "type": "Port Scan", "severity": "high", "source": "10.0.0.5",
             "score": 91.0, "description": "SYN sweep across 1024 ports"},
            {"id": 2, "type": "DNS Tunneling", "severity": "medium", "source": "10.0.0.9",
             "score": 64.0}
        ],
        "devices": [{"ip": "10.0.0.5", "name": "nas"}, {"ip": "10.0.0.9"}]
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_usage() {
    let sandbox = Sandbox::new();
    let output = sandbox.cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    Sandbox::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("overview")
            .and(predicate::str::contains("anomalies"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("login")),
    );
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("netpulse"));
}

#[test]
fn test_completions_bash_and_zsh() {
    for shell in ["bash", "zsh"] {
        Sandbox::new()
            .cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("netpulse"));
    }
}

#[test]
fn test_invalid_output_format_is_usage_error() {
    Sandbox::new()
        .cmd()
        .args(["--output", "xml", "devices"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_override() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_persists_and_show_masks_token() {
    let sandbox = Sandbox::new().with_session("http://127.0.0.1:5000", "tok-secret");

    sandbox
        .cmd()
        .args(["config", "set", "defaults.timeout", "5"])
        .assert()
        .success();

    let output = sandbox
        .cmd()
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown = stdout_json(&output);
    assert_eq!(shown["defaults"]["timeout"], 5);
    assert_eq!(shown["profiles"]["default"]["token"], "****");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("tok-secret"));
}

#[test]
fn test_config_set_unknown_key_is_usage_error() {
    Sandbox::new()
        .cmd()
        .args(["config", "set", "defaults.flavour", "mint"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("defaults.flavour"));
}

// ── Auth ────────────────────────────────────────────────────────────

#[test]
fn test_data_command_without_session_asks_for_login() {
    Sandbox::new()
        .cmd()
        .arg("overview")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("netpulse login"));
}

#[test]
fn test_short_login_password_rejected_before_request() {
    Sandbox::new()
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9", "login", "--email", "ops@example.com", "--password-stdin"])
        .write_stdin("short\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[test]
fn test_weak_reset_password_rejected() {
    Sandbox::new()
        .cmd()
        .args(["--api-url", "http://127.0.0.1:9", "reset-password", "--reset-token", "rst-1", "--password-stdin"])
        .write_stdin("alllowercase\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("uppercase"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_stores_token_for_later_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ops@example.com", "password": "S3cure!pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-fresh"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/network/devices"))
        .and(header("Authorization", "Bearer tok-fresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"ip": "10.0.0.5", "name": "nas"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--api-url", &server.uri(), "login", "--email", "ops@example.com", "--password-stdin"])
        .write_stdin("S3cure!pw\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Logged in as ops@example.com"));

    let saved = sandbox.config_text();
    assert!(saved.contains("tok-fresh"), "token not persisted:\n{saved}");
    assert!(saved.contains(&server.uri()), "api_url not persisted:\n{saved}");

    // The profile now carries both the URL and the token.
    sandbox
        .cmd()
        .args(["-o", "plain", "devices"])
        .assert()
        .success()
        .stdout("10.0.0.5\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_token_is_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok-stale");
    sandbox
        .cmd()
        .arg("devices")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("netpulse login"));

    let saved = sandbox.config_text();
    assert!(!saved.contains("tok-stale"), "stale token kept:\n{saved}");
    assert!(saved.contains("ops@example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_flag_token_is_not_cleared_from_storage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok-stored");
    sandbox
        .cmd()
        .args(["--token", "tok-other", "devices"])
        .assert()
        .code(3);

    assert!(sandbox.config_text().contains("tok-stored"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_clears_token_even_if_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok-live");
    sandbox.cmd().arg("logout").assert().success();
    assert!(!sandbox.config_text().contains("tok-live"));
}

// ── Network data ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_anomalies_forwards_severity_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/anomalies"))
        .and(query_param("hours", "6"))
        .and(query_param("severity", "high"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 42, "type": "Port Scan", "severity": "high", "source": "10.0.0.5", "score": 130.0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok");
    let output = sandbox
        .cmd()
        .args(["-o", "json", "anomalies", "--hours", "6", "--severity", "high"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let rows = stdout_json(&output);
    assert_eq!(rows[0]["id"], "42");
    assert_eq!(rows[0]["severity"], "high");
    // Scores above the scale are clamped.
    assert_eq!(rows[0]["score"], 100.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_alerts_search_filters_plain_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_body()))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok");
    sandbox
        .cmd()
        .args(["-o", "plain", "alerts", "--search", "syn sweep"])
        .assert()
        .success()
        .stdout("1\tPort Scan\n");

    // Newest first when unfiltered.
    sandbox
        .cmd()
        .args(["-o", "plain", "alerts"])
        .assert()
        .success()
        .stdout("2\tDNS Tunneling\n1\tPort Scan\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overview_table_summarises_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_body()))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok");
    sandbox
        .cmd()
        .args(["--color", "never", "overview"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Devices:    2")
                .and(predicate::str::contains("TCP"))
                .and(predicate::str::contains("10.0.0.5"))
                .and(predicate::str::contains("Latest anomaly: DNS Tunneling")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_top_talkers_json_is_ranked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/network/top-talkers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ip": "10.0.0.5", "name": "nas", "inbound": 80.0, "outbound": 40.0, "total": 120.0},
            {"ip": "10.0.0.9", "total": 30.5, "is_anomalous": true}
        ])))
        .mount(&server)
        .await;

    let sandbox = Sandbox::new().with_session(&server.uri(), "tok");
    let output = sandbox
        .cmd()
        .args(["-o", "json", "top-talkers", "--limit", "2"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    insta::assert_snapshot!(String::from_utf8_lossy(&output.stdout).trim_end(), @r#"
    [
      {
        "rank": 1,
        "ip": "10.0.0.5",
        "name": "nas",
        "inbound": 80.0,
        "outbound": 40.0,
        "total": 120.0,
        "is_anomalous": false
      },
      {
        "rank": 2,
        "ip": "10.0.0.9",
        "name": "10.0.0.9",
        "inbound": 0.0,
        "outbound": 0.0,
        "total": 30.5,
        "is_anomalous": true
      }
    ]
    "#);
}
