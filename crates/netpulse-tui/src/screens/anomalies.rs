//! Anomalies screen: every retained anomaly, newest first.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use netpulse_core::{Anomaly, Severity, ViewModel};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::{format, selection};

pub struct AnomaliesScreen {
    focused: bool,
    view: Arc<ViewModel>,
    severity: Option<Severity>,
    query: String,
    /// Indices into `view.anomalies`, newest first.
    visible: Vec<usize>,
    table_state: TableState,
}

/// `f` cycles all → high → medium → low → all.
fn next_severity(current: Option<Severity>) -> Option<Severity> {
    match current {
        None => Some(Severity::High),
        Some(Severity::High) => Some(Severity::Medium),
        Some(Severity::Medium) => Some(Severity::Low),
        Some(Severity::Low) => None,
    }
}

fn matches_query(anomaly: &Anomaly, needle: &str) -> bool {
    needle.is_empty()
        || anomaly.kind.to_lowercase().contains(needle)
        || anomaly.source.to_lowercase().contains(needle)
        || anomaly
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

impl AnomaliesScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            view: Arc::new(ViewModel::default()),
            severity: None,
            query: String::new(),
            visible: Vec::new(),
            table_state: TableState::default(),
        }
    }

    fn recompute(&mut self) {
        let needle = self.query.to_lowercase();
        self.visible = self
            .view
            .anomalies
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, a)| self.severity.is_none_or(|s| a.severity == s))
            .filter(|(_, a)| matches_query(a, &needle))
            .map(|(i, _)| i)
            .collect();
        selection::clamp(&mut self.table_state, self.visible.len());
    }

    fn rows(&self, desc_width: usize) -> Vec<Row<'static>> {
        self.visible
            .iter()
            .filter_map(|&i| self.view.anomalies.get(i))
            .map(|a| {
                let description = a.description.as_deref().unwrap_or("");
                Row::new(vec![
                    Cell::from(format::clock(a.timestamp)),
                    Cell::from(a.severity.to_string()).style(theme::severity_style(a.severity)),
                    Cell::from(a.kind.clone()),
                    Cell::from(a.source.clone()),
                    Cell::from(format!("{:>5.1}", a.score)),
                    Cell::from(format::truncate(description, desc_width)),
                ])
                .style(theme::table_row())
            })
            .collect()
    }
}

impl Component for AnomaliesScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if selection::navigate(&mut self.table_state, self.visible.len(), key) {
            return Ok(None);
        }
        if key.code == KeyCode::Char('f') {
            self.severity = next_severity(self.severity);
            self.recompute();
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ViewUpdated(view) => {
                self.view = Arc::clone(view);
                self.recompute();
            }
            Action::SearchInput(query) => {
                self.query.clone_from(query);
                self.recompute();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Anomalies ({}/{}) ",
            self.visible.len(),
            self.view.anomalies.len()
        );
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

        let severity_label = self
            .severity
            .map_or_else(|| "all".to_owned(), |s| s.to_string());
        let mut status = vec![
            Span::styled("  Severity: ", theme::table_row()),
            Span::styled(format!("[{severity_label}]"), theme::key_hint_key()),
        ];
        if !self.query.is_empty() {
            status.push(Span::styled("  Search: ", theme::table_row()));
            status.push(Span::styled(
                format!("\"{}\"", self.query),
                theme::key_hint_key(),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), layout[0]);

        if self.visible.is_empty() {
            let msg = if self.view.anomalies.is_empty() {
                "  No anomalies detected"
            } else {
                "  No anomalies match the current filter"
            };
            frame.render_widget(Paragraph::new(msg).style(theme::muted()), layout[1]);
        } else {
            let desc_width = usize::from(layout[1].width.saturating_sub(60)).max(10);
            let header = Row::new(
                ["Time", "Severity", "Kind", "Source", "Score", "Description"]
                    .map(|h| Cell::from(h).style(theme::table_header())),
            );
            let widths = [
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(18),
                Constraint::Length(16),
                Constraint::Length(6),
                Constraint::Fill(1),
            ];
            let table = Table::new(self.rows(desc_width), widths)
                .header(header)
                .row_highlight_style(theme::table_selected());
            let mut state = self.table_state.clone();
            frame.render_stateful_widget(table, layout[1], &mut state);
        }

        let hints = Line::from(vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("f ", theme::key_hint_key()),
            Span::styled("severity  ", theme::key_hint()),
            Span::styled("/ ", theme::key_hint_key()),
            Span::styled("search", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use netpulse_core::AnomalyId;
    use pretty_assertions::assert_eq;

    fn anomaly(id: &str, severity: Severity, source: &str) -> Anomaly {
        Anomaly {
            id: AnomalyId::new(id),
            timestamp: None,
            severity,
            kind: "Port Scan".into(),
            source: source.into(),
            score: 50.0,
            description: None,
        }
    }

    fn screen() -> AnomaliesScreen {
        let view = ViewModel {
            anomalies: vec![
                anomaly("1", Severity::Low, "10.0.0.1"),
                anomaly("2", Severity::High, "10.0.0.2"),
                anomaly("3", Severity::High, "10.0.0.3"),
            ],
            ..ViewModel::default()
        };
        let mut screen = AnomaliesScreen::new();
        screen.update(&Action::ViewUpdated(Arc::new(view))).unwrap();
        screen
    }

    fn ids(screen: &AnomaliesScreen) -> Vec<&str> {
        screen
            .visible
            .iter()
            .map(|&i| screen.view.anomalies[i].id.as_str())
            .collect()
    }

    #[test]
    fn newest_anomalies_come_first() {
        assert_eq!(ids(&screen()), ["3", "2", "1"]);
    }

    #[test]
    fn f_cycles_severity_filter() {
        let mut screen = screen();
        let f = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE);

        screen.handle_key_event(f).unwrap();
        assert_eq!(ids(&screen), ["3", "2"]);
        screen.handle_key_event(f).unwrap();
        assert!(screen.visible.is_empty());
        screen.handle_key_event(f).unwrap();
        assert_eq!(ids(&screen), ["1"]);
        screen.handle_key_event(f).unwrap();
        assert_eq!(screen.visible.len(), 3);
    }

    #[test]
    fn search_matches_source_address() {
        let mut screen = screen();
        screen
            .update(&Action::SearchInput("10.0.0.2".into()))
            .unwrap();
        assert_eq!(ids(&screen), ["2"]);
    }
}
