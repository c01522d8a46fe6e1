//! `watch`: follow the live stream, one line per merged update and one
//! per new alert.

use std::collections::HashSet;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::debug;

use netpulse_core::{Alert, AlertStore, AnomalyId, ConnectionState, CoreError, Monitor, ViewModel};

use crate::cli::{OutputFormat, WatchArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

/// Line printer for the watch loop. Structured formats emit one compact
/// JSON object per line.
struct Printer {
    structured: bool,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn new(ctx: &Context) -> Self {
        Self {
            structured: !matches!(ctx.output, OutputFormat::Table | OutputFormat::Plain),
            color: ctx.color,
            quiet: ctx.quiet,
        }
    }

    fn clock() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn emit(&self, line: &str) {
        output::print_output(line, self.quiet);
    }

    fn update(&self, view: &ViewModel) {
        let s = &view.stats;
        if self.structured {
            self.emit(&json!({ "event": "update", "stats": s }).to_string());
            return;
        }
        self.emit(&format!(
            "{}  devices={}  rate={}  anomalies={}  alerts={}",
            Self::clock(),
            s.devices,
            s.traffic_rate,
            s.anomaly_count,
            s.alert_count,
        ));
    }

    fn alert(&self, alert: &Alert) {
        if self.structured {
            self.emit(&json!({ "event": "alert", "alert": alert }).to_string());
            return;
        }
        let tag = if self.color {
            "ALERT".bold().to_string()
        } else {
            "ALERT".to_owned()
        };
        self.emit(&format!(
            "{}  {tag} [{}] {}: {}",
            Self::clock(),
            output::severity(alert.severity, self.color),
            alert.title,
            alert.description,
        ));
    }

    fn status(&self, state: &ConnectionState) {
        if self.structured {
            self.emit(
                &json!({
                    "event": "status",
                    "connected": state.is_connected,
                    "error": state.last_error,
                })
                .to_string(),
            );
            return;
        }
        let text = if state.is_connected {
            "connected".to_owned()
        } else {
            format!(
                "disconnected: {}",
                state.last_error.as_deref().unwrap_or("unknown error")
            )
        };
        let text = match (self.color, state.is_connected) {
            (true, true) => text.green().to_string(),
            (true, false) => text.red().to_string(),
            (false, _) => text,
        };
        self.emit(&format!("{}  {text}", Self::clock()));
    }
}

/// Alerts not reported yet, oldest first. Ids that left the store are
/// forgotten so a long watch stays bounded by the store's cap.
fn unseen_alerts<'a>(seen: &mut HashSet<AnomalyId>, store: &'a AlertStore) -> Vec<&'a Alert> {
    seen.retain(|id| store.contains(id));
    store
        .alerts()
        .iter()
        .filter(|alert| seen.insert(alert.id.clone()))
        .collect()
}

fn spinner(ctx: &Context, url: &str) -> Option<ProgressBar> {
    if ctx.quiet {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Connecting to {url}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

#[allow(clippy::too_many_lines)]
pub async fn handle(args: &WatchArgs, ctx: &mut Context) -> Result<(), CliError> {
    let config = ctx.monitor_config()?;
    if config.token.is_none() {
        return Err(CliError::NotLoggedIn {
            profile: ctx.profile.clone(),
        });
    }
    let url = config.base_url.to_string();
    let monitor = Monitor::new(config)?;

    let mut views = monitor.subscribe_view();
    let mut alerts = monitor.subscribe_alerts();
    let mut connection = monitor.subscribe_connection();
    let subscription = monitor.connect();

    let printer = Printer::new(ctx);
    let mut progress = spinner(ctx, &url);
    let mut seen: HashSet<AnomalyId> = HashSet::new();
    let mut last_state = ConnectionState::default();

    let stop = async {
        match args.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(stop);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break Ok(());
            }
            () = &mut stop => break Ok(()),
            changed = connection.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = connection.borrow_and_update().clone();
                if state.auth_expired {
                    let message = state.last_error.clone().unwrap_or_default();
                    break Err(CoreError::SessionExpired { message });
                }
                if state.is_connected {
                    if let Some(pb) = progress.take() {
                        pb.finish_and_clear();
                    }
                }
                let reportable = state.is_connected != last_state.is_connected
                    || (!state.is_connected && state.last_error != last_state.last_error);
                if reportable {
                    if let Some(pb) = &progress {
                        pb.set_message(format!(
                            "Connecting to {url} ({})",
                            state.last_error.as_deref().unwrap_or("waiting")
                        ));
                    } else {
                        printer.status(&state);
                    }
                }
                last_state = state;
            }
            view = views.changed() => {
                let Some(view) = view else { break Ok(()) };
                if let Some(pb) = progress.take() {
                    pb.finish_and_clear();
                }
                printer.update(&view);
            }
            store = alerts.changed() => {
                let Some(store) = store else { break Ok(()) };
                for alert in unseen_alerts(&mut seen, &store) {
                    printer.alert(alert);
                }
            }
        }
    };

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    subscription.disconnect();
    result.map_err(|e| ctx.fail(e))
}
