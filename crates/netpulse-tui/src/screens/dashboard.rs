//! Dashboard screen: stat cards, live throughput, protocol mix, top talkers
//! and the latest anomalies on one page.

use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};
use throbber_widgets_tui::{BRAILLE_SIX, Throbber, ThrobberState};

use netpulse_core::ViewModel;

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::{charts, format};

const RECENT_ANOMALIES: usize = 8;

pub struct DashboardScreen {
    focused: bool,
    view: Arc<ViewModel>,
    unacknowledged: usize,
    /// Set once the first snapshot lands; until then a spinner is shown.
    loaded: bool,
    last_update: Option<Instant>,
    throbber: ThrobberState,
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_default())
}

impl DashboardScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            view: Arc::new(ViewModel::default()),
            unacknowledged: 0,
            loaded: false,
            last_update: None,
            throbber: ThrobberState::default(),
        }
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let stats = &self.view.stats;
        let cards = [
            ("Devices", stats.devices.to_string(), theme::PULSE_TEAL),
            ("Traffic", stats.traffic_rate.clone(), theme::OK_GREEN),
            (
                "Alerts",
                format!("{} ({} new)", stats.alert_count, self.unacknowledged),
                theme::FLARE_PINK,
            ),
            ("Anomalies", stats.anomaly_count.to_string(), theme::AMBER),
        ];
        let cols = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);
        for ((label, value, color), col) in cards.into_iter().zip(cols.iter()) {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color));
            let body = vec![
                Line::styled(label, theme::key_hint()),
                Line::styled(value, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            ];
            frame.render_widget(
                Paragraph::new(body).alignment(Alignment::Center).block(block),
                *col,
            );
        }
    }

    fn render_talkers(&self, frame: &mut Frame, area: Rect) {
        let block = panel("Top Talkers");
        if self.view.top_talkers.is_empty() {
            frame.render_widget(
                Paragraph::new("  No traffic yet").style(theme::muted()).block(block),
                area,
            );
            return;
        }
        let header = Row::new(
            ["#", "Host", "In", "Out", "Total"].map(|h| Cell::from(h).style(theme::table_header())),
        );
        let rows: Vec<Row> = self
            .view
            .top_talkers
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let style = if t.is_anomalous {
                    Style::default().fg(theme::ALERT_RED)
                } else {
                    theme::table_row()
                };
                let host = if t.name.is_empty() { &t.ip } else { &t.name };
                Row::new(vec![
                    Cell::from((i + 1).to_string()),
                    Cell::from(host.clone()),
                    Cell::from(format::mbps(t.inbound)),
                    Cell::from(format::mbps(t.outbound)),
                    Cell::from(format::mbps(t.total)),
                ])
                .style(style)
            })
            .collect();
        let widths = [
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ];
        frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
    }

    fn render_recent(&self, frame: &mut Frame, area: Rect) {
        let block = panel("Recent Anomalies");
        if self.view.anomalies.is_empty() {
            frame.render_widget(
                Paragraph::new("  All quiet").style(theme::muted()).block(block),
                area,
            );
            return;
        }
        let lines: Vec<Line> = self
            .view
            .anomalies
            .iter()
            .rev()
            .take(RECENT_ANOMALIES)
            .map(|a| {
                Line::from(vec![
                    Span::styled(format!(" {} ", format::clock(a.timestamp)), theme::muted()),
                    Span::styled(
                        format!("{:<6} ", a.severity.to_string()),
                        theme::severity_style(a.severity),
                    ),
                    Span::styled(format!("{} ", a.kind), theme::table_row()),
                    Span::styled(a.source.clone(), theme::key_hint()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_loading(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(area);
        let cols = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(28),
            Constraint::Fill(1),
        ])
        .split(rows[1]);
        let throbber = Throbber::default()
            .label("Loading network data…")
            .style(Style::default().fg(theme::TEXT))
            .throbber_style(Style::default().fg(theme::SIGNAL_VIOLET))
            .throbber_set(BRAILLE_SIX);
        let mut state = self.throbber.clone();
        frame.render_stateful_widget(throbber, cols[1], &mut state);
    }
}

impl Component for DashboardScreen {
    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ViewUpdated(view) => {
                self.view = Arc::clone(view);
                if !view.is_empty() {
                    self.loaded = true;
                    self.last_update = Some(Instant::now());
                }
            }
            Action::ConnectionChanged(state) if state.is_connected => self.loaded = true,
            Action::AlertsUpdated(store) => self.unacknowledged = store.unacknowledged_count(),
            Action::Tick if !self.loaded => self.throbber.calc_next(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let updated = self
            .last_update
            .map_or_else(String::new, |t| format!(" updated {} ", format::age(t.elapsed())));
        let outer = Block::default()
            .title(" Network Overview ")
            .title_style(theme::title_style())
            .title_bottom(Line::styled(updated, theme::muted()).right_aligned())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        if !self.loaded {
            self.render_loading(frame, inner);
            return;
        }

        let rows = Layout::vertical([
            Constraint::Length(4),
            Constraint::Percentage(45),
            Constraint::Fill(1),
        ])
        .split(inner);
        self.render_cards(frame, rows[0]);

        let middle =
            Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).split(rows[1]);
        charts::render_traffic(frame, middle[0], &self.view.traffic, panel("Throughput (Mbps)"));

        let proto_block = panel("Protocols");
        let width = proto_block.inner(middle[1]).width;
        let body = if self.view.protocols.is_empty() {
            Paragraph::new("  No protocol data").style(theme::muted())
        } else {
            Paragraph::new(charts::protocol_lines(&self.view.protocols, width))
        };
        frame.render_widget(body.block(proto_block), middle[1]);

        let bottom =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(rows[2]);
        self.render_talkers(frame, bottom[0]);
        self.render_recent(frame, bottom[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
