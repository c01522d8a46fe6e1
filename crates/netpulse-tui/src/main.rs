//! `netpulse-tui`: live terminal dashboard for network traffic and
//! anomaly monitoring.
//!
//! Built on [ratatui](https://ratatui.rs). Screens are reachable with the
//! number keys (1-5): Dashboard, Anomalies, Devices, Traffic and Alerts.
//! Without a usable session token the login overlay is shown first.
//!
//! Logs go to a daily-rotated file under the platform data directory so
//! they never corrupt the terminal UI.

mod action;
mod app;
mod auth;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use secrecy::SecretString;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;

/// Terminal dashboard for live network traffic and anomaly monitoring.
#[derive(Parser, Debug)]
#[command(name = "netpulse-tui", version, about)]
struct Cli {
    /// Config profile to use
    #[arg(short, long, env = "NETPULSE_PROFILE")]
    profile: Option<String>,

    /// Backend URL (e.g., http://localhost:5000)
    #[arg(short = 'u', long, env = "NETPULSE_API_URL")]
    api_url: Option<String>,

    /// Session token; skips the stored one and is never persisted
    #[arg(long, env = "NETPULSE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "netpulse").map_or_else(
        || std::env::temp_dir().join("netpulse"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

/// File-only tracing: nothing may reach stdout/stderr while the terminal
/// is in raw mode. Hold the returned guard so buffered lines are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,netpulse_tui={log_level},netpulse_core={log_level},netpulse_api={log_level}"
        ))
    });

    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    let file_appender = tracing_appender::rolling::daily(log_dir, "netpulse-tui.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks go in before the terminal is entered.
    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = netpulse_config::load_config_or_default();
    let profile = config.profile_name(cli.profile.as_deref());

    let flag_token = cli.token.clone().filter(|t| !t.is_empty()).map(SecretString::from);
    let token_from_flag = flag_token.is_some();
    let token = netpulse_config::resolve_token(flag_token, config.profile(&profile), &profile);

    let base = netpulse_config::monitor_config(
        &config,
        &profile,
        cli.api_url.as_deref(),
        None,
        None,
    )
    .wrap_err("invalid backend settings")?;

    info!(
        profile = %profile,
        url = %base.base_url,
        has_token = token.is_some(),
        "starting netpulse-tui"
    );

    let mut app = App::new(config, profile, base, token, token_from_flag);
    app.run().await
}
