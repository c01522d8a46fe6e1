//! Alerts screen: acknowledgeable alerts derived from anomalies.
//!
//! Newest first. `a` acknowledges the selected alert, `h` hides or shows
//! acknowledged ones, and the global `/` search narrows by title or
//! description.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use netpulse_core::{Alert, AlertFilter, AlertStore};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::{format, selection};

pub struct AlertsScreen {
    focused: bool,
    store: Arc<AlertStore>,
    filter: AlertFilter,
    /// Filtered view, newest first.
    visible: Vec<Alert>,
    table_state: TableState,
}

impl AlertsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            store: Arc::new(AlertStore::new()),
            filter: AlertFilter::default(),
            visible: Vec::new(),
            table_state: TableState::default(),
        }
    }

    fn recompute(&mut self) {
        self.visible = self.store.filter(&self.filter).cloned().collect();
        self.visible.reverse();
        selection::clamp(&mut self.table_state, self.visible.len());
    }

    fn selected(&self) -> Option<&Alert> {
        self.table_state.selected().and_then(|i| self.visible.get(i))
    }
}

impl Component for AlertsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if selection::navigate(&mut self.table_state, self.visible.len(), key) {
            return Ok(None);
        }
        match key.code {
            KeyCode::Char('a') => Ok(self
                .selected()
                .filter(|alert| !alert.acknowledged)
                .map(|alert| Action::AcknowledgeAlert(alert.id.clone()))),
            KeyCode::Char('h') => {
                self.filter.show_acknowledged = !self.filter.show_acknowledged;
                self.recompute();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::AlertsUpdated(store) => {
                self.store = Arc::clone(store);
                self.recompute();
            }
            Action::SearchInput(query) => {
                self.filter.query.clone_from(query);
                self.recompute();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let unacked = self.store.unacknowledged_count();
        let title = format!(" Alerts ({unacked} unacknowledged) ");
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
            Constraint::Length(1), // filter status
            Constraint::Min(1),    // table
            Constraint::Length(1), // hints
        ])
        .split(inner);

        let mut status = vec![
            Span::styled("  Acknowledged: ", theme::table_row()),
            Span::styled(
                if self.filter.show_acknowledged {
                    "[shown]"
                } else {
                    "[hidden]"
                },
                theme::key_hint_key(),
            ),
        ];
        if !self.filter.query.is_empty() {
            status.push(Span::styled("  Search: ", theme::table_row()));
            status.push(Span::styled(
                format!("\"{}\"", self.filter.query),
                theme::key_hint_key(),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(status)), layout[0]);

        if self.visible.is_empty() {
            let msg = if self.store.alerts().is_empty() {
                "  No alerts yet"
            } else {
                "  No alerts match the current filter"
            };
            frame.render_widget(Paragraph::new(msg).style(theme::muted()), layout[1]);
        } else {
            let desc_width = usize::from(layout[1].width.saturating_sub(48)).max(10);
            let header = Row::new(["", "Time", "Severity", "Title", "Description"].map(|h| {
                Cell::from(h).style(theme::table_header())
            }));
            let rows: Vec<Row> = self
                .visible
                .iter()
                .map(|alert| {
                    let (mark, row_style) = if alert.acknowledged {
                        ("✓", theme::muted())
                    } else {
                        ("●", theme::table_row())
                    };
                    let severity_style = if alert.acknowledged {
                        theme::muted()
                    } else {
                        theme::severity_style(alert.severity)
                    };
                    Row::new(vec![
                        Cell::from(mark).style(severity_style),
                        Cell::from(format::clock(alert.timestamp)),
                        Cell::from(alert.severity.to_string()).style(severity_style),
                        Cell::from(alert.title.clone()),
                        Cell::from(format::truncate(&alert.description, desc_width)),
                    ])
                    .style(row_style)
                })
                .collect();

            let widths = [
                Constraint::Length(2),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(22),
                Constraint::Fill(1),
            ];
            let table = Table::new(rows, widths)
                .header(header)
                .row_highlight_style(theme::table_selected());

            let mut state = self.table_state.clone();
            frame.render_stateful_widget(table, layout[1], &mut state);
        }

        let hints = Line::from(vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("acknowledge  ", theme::key_hint()),
            Span::styled("h ", theme::key_hint_key()),
            Span::styled("toggle acknowledged  ", theme::key_hint()),
            Span::styled("/ ", theme::key_hint_key()),
            Span::styled("search", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}
