//! One-shot network queries: overview, traffic, anomalies, devices,
//! top talkers.

use std::fmt::Write as _;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

use netpulse_core::{Anomaly, AnomalyQuery, Device, Monitor, TopTalker, TrafficPoint, ViewModel};

use crate::cli::{AnomaliesArgs, TopTalkersArgs, TrafficArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

/// Monitor for direct queries. No stream is opened.
fn monitor(ctx: &Context) -> Result<Monitor, CliError> {
    let mut config = ctx.monitor_config()?;
    config.stream_enabled = false;
    Ok(Monitor::new(config)?)
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TrafficRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Mbps")]
    value: String,
}

#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Score")]
    score: String,
}

impl AnomalyRow {
    fn new(a: &Anomaly, color: bool) -> Self {
        Self {
            id: a.id.to_string(),
            time: util::when(a.timestamp),
            severity: output::severity(a.severity, color),
            kind: a.kind.clone(),
            source: a.source.clone(),
            score: format!("{:.0}", a.score),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "In")]
    inbound: String,
    #[tabled(rename = "Out")]
    outbound: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Peers")]
    peers: usize,
    #[tabled(rename = "Anomalous")]
    anomalous: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            name: d.name.clone(),
            ip: d.ip.clone(),
            kind: d.kind.clone(),
            inbound: output::mbps(d.inbound),
            outbound: output::mbps(d.outbound),
            total: output::mbps(d.total),
            peers: d.connections.len(),
            anomalous: output::flag(d.anomalous, color),
        }
    }
}

#[derive(Serialize)]
struct Ranked<'a> {
    rank: usize,
    #[serde(flatten)]
    talker: &'a TopTalker,
}

#[derive(Tabled)]
struct TalkerRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "In")]
    inbound: String,
    #[tabled(rename = "Out")]
    outbound: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Anomalous")]
    anomalous: String,
}

// ── Overview ────────────────────────────────────────────────────────

fn overview_detail(view: &ViewModel, color: bool) -> String {
    let mut out = String::new();
    let s = &view.stats;
    let _ = writeln!(out, "Devices:    {}", s.devices);
    let _ = writeln!(out, "Traffic:    {}", s.traffic_rate);
    let _ = writeln!(out, "Alerts:     {}", s.alert_count);
    let _ = writeln!(out, "Anomalies:  {}", s.anomaly_count);

    if !view.protocols.is_empty() {
        let _ = writeln!(out, "\nProtocols");
        for (name, share) in &view.protocols {
            let _ = writeln!(out, "  {name:<10} {share:>6.1}%");
        }
    }

    if !view.top_talkers.is_empty() {
        let _ = writeln!(out, "\nTop talkers");
        for t in view.top_talkers.iter().take(5) {
            let marker = match (t.is_anomalous, color) {
                (true, true) => format!("  {}", "anomalous".red()),
                (true, false) => "  anomalous".to_owned(),
                (false, _) => String::new(),
            };
            let _ = writeln!(out, "  {:<16} {:>10} Mbps{marker}", t.ip, output::mbps(t.total));
        }
    }

    if let Some(latest) = view.anomalies.last() {
        let _ = writeln!(
            out,
            "\nLatest anomaly: {} from {} ({})",
            latest.kind,
            latest.source,
            output::severity(latest.severity, color)
        );
    }
    out.trim_end().to_owned()
}

pub async fn overview(ctx: &mut Context) -> Result<(), CliError> {
    let config = ctx.monitor_config()?;
    let view = ctx.check(Monitor::oneshot(config, |m| async move { Ok(m.view()) }).await)?;

    let color = ctx.color;
    let out = output::render_single(
        ctx.output,
        &*view,
        |v| overview_detail(v, color),
        |v| v.stats.traffic_rate.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

// ── Lists ───────────────────────────────────────────────────────────

pub async fn traffic(args: &TrafficArgs, ctx: &mut Context) -> Result<(), CliError> {
    let m = monitor(ctx)?;
    let points: Vec<TrafficPoint> = ctx.check(m.traffic(args.hours).await)?;

    let out = output::render_list(
        ctx.output,
        &points,
        |p| TrafficRow {
            time: util::when(p.timestamp),
            value: output::mbps(p.value),
        },
        |p| p.value.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn anomalies(args: &AnomaliesArgs, ctx: &mut Context) -> Result<(), CliError> {
    let mut query = AnomalyQuery::new(args.hours);
    if let Some(severity) = args.severity {
        query = query.severity(severity.as_str());
    }

    let m = monitor(ctx)?;
    let anomalies = ctx.check(m.anomalies(&query).await)?;

    let color = ctx.color;
    let out = output::render_list(
        ctx.output,
        &anomalies,
        |a| AnomalyRow::new(a, color),
        |a| a.id.to_string(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn devices(ctx: &mut Context) -> Result<(), CliError> {
    let m = monitor(ctx)?;
    let devices = ctx.check(m.devices().await)?;

    let color = ctx.color;
    let out = output::render_list(
        ctx.output,
        &devices,
        |d| DeviceRow::new(d, color),
        |d| d.ip.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn top_talkers(args: &TopTalkersArgs, ctx: &mut Context) -> Result<(), CliError> {
    let m = monitor(ctx)?;
    let talkers: Vec<TopTalker> = ctx.check(m.top_talkers().await)?;
    let ranked: Vec<Ranked<'_>> = talkers
        .iter()
        .take(args.limit)
        .enumerate()
        .map(|(i, talker)| Ranked { rank: i + 1, talker })
        .collect();

    let color = ctx.color;
    let out = output::render_list(
        ctx.output,
        &ranked,
        |r| TalkerRow {
            rank: r.rank,
            name: r.talker.name.clone(),
            ip: r.talker.ip.clone(),
            inbound: output::mbps(r.talker.inbound),
            outbound: output::mbps(r.talker.outbound),
            total: output::mbps(r.talker.total),
            anomalous: output::flag(r.talker.is_anomalous, color),
        },
        |r| r.talker.ip.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
