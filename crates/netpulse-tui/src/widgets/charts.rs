//! Traffic line chart and protocol bars shared by the dashboard and the
//! traffic screen.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Paragraph};

use netpulse_core::{ProtocolDistribution, TrafficPoint};

use crate::theme;

/// Summary of a traffic series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficSummary {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl TrafficSummary {
    pub fn of(points: &[TrafficPoint]) -> Option<Self> {
        let current = points.last()?.value;
        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for p in points {
            min = min.min(p.value);
            max = max.max(p.value);
            sum += p.value;
        }
        #[allow(clippy::cast_precision_loss)]
        let avg = sum / points.len() as f64;
        Some(Self {
            current,
            min,
            max,
            avg,
        })
    }
}

/// Plot the most recent `width * 2` points (braille doubles the horizontal
/// resolution) inside `block`.
pub fn render_traffic(frame: &mut Frame, area: Rect, points: &[TrafficPoint], block: Block) {
    let inner = block.inner(area);
    let window = usize::from(inner.width.max(1)) * 2;
    let tail = &points[points.len().saturating_sub(window)..];

    if tail.is_empty() {
        frame.render_widget(
            Paragraph::new("  Waiting for traffic samples…")
                .style(theme::muted())
                .block(block),
            area,
        );
        return;
    }

    #[allow(clippy::cast_precision_loss)]
    let data: Vec<(f64, f64)> = tail
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();
    let peak = tail.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let y_max = if peak > 0.0 { peak * 1.1 } else { 1.0 };
    #[allow(clippy::cast_precision_loss)]
    let x_max = (tail.len().saturating_sub(1)).max(1) as f64;

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(theme::PULSE_TEAL))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(Axis::default().bounds([0.0, x_max]).style(theme::muted()))
        .y_axis(
            Axis::default()
                .bounds([0.0, y_max])
                .style(theme::muted())
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{y_max:.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

/// One line per protocol: name, proportional bar, percentage.
pub fn protocol_lines(protocols: &ProtocolDistribution, width: u16) -> Vec<Line<'static>> {
    let total: f64 = protocols.values().sum();
    let name_width = protocols.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    let bar_width = usize::from(width).saturating_sub(name_width + 10).max(1);

    protocols
        .iter()
        .enumerate()
        .map(|(i, (name, value))| {
            let share = if total > 0.0 { value / total } else { 0.0 };
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let filled = ((share * bar_width as f64).round() as usize).min(bar_width);
            let color = theme::PROTOCOL_SERIES[i % theme::PROTOCOL_SERIES.len()];
            Line::from(vec![
                Span::styled(format!(" {name:<name_width$} "), theme::table_row()),
                Span::styled("█".repeat(filled), Style::default().fg(color)),
                Span::styled("░".repeat(bar_width - filled), theme::muted()),
                Span::styled(format!(" {:>5.1}%", share * 100.0), theme::table_row()),
            ])
        })
        .collect()
}
