//! Alert listing, derived from the anomalies in a fresh snapshot.

use tabled::Tabled;

use netpulse_core::{Alert, AlertFilter, Monitor};

use crate::cli::AlertsArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Ack")]
    acknowledged: &'static str,
}

impl AlertRow {
    fn new(a: &Alert, color: bool) -> Self {
        Self {
            id: a.id.to_string(),
            severity: output::severity(a.severity, color),
            title: a.title.clone(),
            description: a.description.clone(),
            time: util::when(a.timestamp),
            acknowledged: if a.acknowledged { "yes" } else { "no" },
        }
    }
}

pub async fn handle(args: &AlertsArgs, ctx: &mut Context) -> Result<(), CliError> {
    let config = ctx.monitor_config()?;
    let store = ctx.check(Monitor::oneshot(config, |m| async move { Ok(m.alerts()) }).await)?;

    let filter = AlertFilter {
        query: args.search.clone().unwrap_or_default(),
        show_acknowledged: !args.hide_acknowledged,
    };
    let mut alerts: Vec<Alert> = store.filter(&filter).cloned().collect();
    // Newest first, like the dashboard.
    alerts.reverse();

    let color = ctx.color;
    let out = output::render_list(
        ctx.output,
        &alerts,
        |a| AlertRow::new(a, color),
        |a| format!("{}\t{}", a.id, a.title),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
