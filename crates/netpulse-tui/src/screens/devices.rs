//! Devices screen: heaviest talkers first, with an optional detail pane.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use netpulse_core::{Device, ViewModel};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::{format, selection};

pub struct DevicesScreen {
    focused: bool,
    view: Arc<ViewModel>,
    query: String,
    /// Indices into `view.devices`, sorted by total traffic descending.
    visible: Vec<usize>,
    table_state: TableState,
    show_detail: bool,
}

impl DevicesScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            view: Arc::new(ViewModel::default()),
            query: String::new(),
            visible: Vec::new(),
            table_state: TableState::default(),
            show_detail: false,
        }
    }

    fn recompute(&mut self) {
        let needle = self.query.to_lowercase();
        let devices = &self.view.devices;
        let mut visible: Vec<usize> = devices
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                needle.is_empty()
                    || d.name.to_lowercase().contains(&needle)
                    || d.ip.contains(&needle)
                    || d.kind.to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect();
        visible.sort_by(|&a, &b| devices[b].total.total_cmp(&devices[a].total));
        self.visible = visible;
        selection::clamp(&mut self.table_state, self.visible.len());
    }

    fn selected(&self) -> Option<&Device> {
        self.table_state
            .selected()
            .and_then(|i| self.visible.get(i))
            .and_then(|&i| self.view.devices.get(i))
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, device: &Device) {
        let block = Block::default()
            .title(format!(" {} ", device.name))
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());

        let label = |text: &'static str| Span::styled(text, theme::key_hint());
        let value = |text: String| Span::styled(text, theme::table_row());

        let mut lines = vec![
            Line::from(vec![label("  IP        "), value(device.ip.clone())]),
            Line::from(vec![label("  Type      "), value(device.kind.clone())]),
            Line::from(vec![
                label("  In/Out    "),
                value(format!(
                    "{} / {} Mbps",
                    format::mbps(device.inbound),
                    format::mbps(device.outbound)
                )),
            ]),
            Line::from(vec![
                label("  Status    "),
                if device.anomalous {
                    Span::styled("anomalous", Style::default().fg(theme::ALERT_RED))
                } else {
                    Span::styled("normal", Style::default().fg(theme::OK_GREEN))
                },
            ]),
            Line::from(""),
            Line::from(label("  Connections")),
        ];
        if device.connections.is_empty() {
            lines.push(Line::styled("    none", theme::muted()));
        }
        for peer in &device.connections {
            let name = self
                .view
                .device(peer)
                .map_or_else(String::new, |d| format!("  {}", d.name));
            lines.push(Line::from(vec![
                Span::styled(format!("    {peer}"), theme::table_row()),
                Span::styled(name, theme::muted()),
            ]));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

impl Component for DevicesScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if selection::navigate(&mut self.table_state, self.visible.len(), key) {
            return Ok(None);
        }
        if key.code == KeyCode::Enter && self.selected().is_some() {
            self.show_detail = !self.show_detail;
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
            Action::GoBack => self.show_detail = false,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let (table_area, detail_area) = match self.selected() {
            Some(device) if self.show_detail => {
                let cols = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                    .split(area);
                (cols[0], Some((cols[1], device)))
            }
            _ => (area, None),
        };

        let title = format!(" Devices ({}) ", self.visible.len());
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
        let inner = block.inner(table_area);
        frame.render_widget(block, table_area);

        let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        if self.visible.is_empty() {
            let msg = if self.view.devices.is_empty() {
                "  No devices reported"
            } else {
                "  No devices match the current search"
            };
            frame.render_widget(Paragraph::new(msg).style(theme::muted()), layout[0]);
        } else {
            let header = Row::new(
                ["", "Name", "IP", "Type", "In", "Out", "Total"]
                    .map(|h| Cell::from(h).style(theme::table_header())),
            );
            let rows: Vec<Row> = self
                .visible
                .iter()
                .filter_map(|&i| self.view.devices.get(i))
                .map(|d| {
                    let marker = if d.anomalous {
                        Cell::from("!").style(Style::default().fg(theme::ALERT_RED))
                    } else {
                        Cell::from("")
                    };
                    Row::new(vec![
                        marker,
                        Cell::from(d.name.clone()),
                        Cell::from(d.ip.clone()),
                        Cell::from(d.kind.clone()),
                        Cell::from(format::mbps(d.inbound)),
                        Cell::from(format::mbps(d.outbound)),
                        Cell::from(format::mbps(d.total)),
                    ])
                    .style(theme::table_row())
                })
                .collect();
            let widths = [
                Constraint::Length(1),
                Constraint::Fill(2),
                Constraint::Length(16),
                Constraint::Fill(1),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(9),
            ];
            let table = Table::new(rows, widths)
                .header(header)
                .row_highlight_style(theme::table_selected());
            let mut state = self.table_state.clone();
            frame.render_stateful_widget(table, layout[0], &mut state);
        }

        let hints = Line::from(vec![
            Span::styled("  j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("details  ", theme::key_hint()),
            Span::styled("/ ", theme::key_hint_key()),
            Span::styled("search", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[1]);

        if let Some((area, device)) = detail_area {
            self.render_detail(frame, area, device);
        }
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
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn device(name: &str, ip: &str, total: f64, connections: &[&str]) -> Device {
        Device {
            id: ip.into(),
            name: name.into(),
            kind: "workstation".into(),
            ip: ip.into(),
            connections: connections.iter().map(|c| (*c).to_owned()).collect(),
            anomalous: false,
            inbound: total / 2.0,
            outbound: total / 2.0,
            total,
        }
    }

    fn screen() -> DevicesScreen {
        let view = ViewModel {
            devices: vec![
                device("printer", "10.0.0.9", 1.0, &[]),
                device("nas", "10.0.0.2", 40.0, &["10.0.0.9"]),
                device("laptop", "10.0.0.5", 12.0, &["10.0.0.2"]),
            ],
            ..ViewModel::default()
        };
        let mut screen = DevicesScreen::new();
        screen.update(&Action::ViewUpdated(Arc::new(view))).unwrap();
        screen
    }

    fn names(screen: &DevicesScreen) -> Vec<&str> {
        screen
            .visible
            .iter()
            .map(|&i| screen.view.devices[i].name.as_str())
            .collect()
    }

    #[test]
    fn sorted_by_total_traffic() {
        assert_eq!(names(&screen()), ["nas", "laptop", "printer"]);
    }

    #[test]
    fn search_filters_by_name_or_ip() {
        let mut screen = screen();
        screen.update(&Action::SearchInput("LAP".into())).unwrap();
        assert_eq!(names(&screen), ["laptop"]);
        screen.update(&Action::SearchInput("10.0.0.9".into())).unwrap();
        assert_eq!(names(&screen), ["printer"]);
    }

    #[test]
    fn detail_pane_lists_named_peers() {
        let mut screen = screen();
        screen
            .handle_key_event(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
            .unwrap();
        assert!(screen.show_detail);

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| screen.render(f, f.area())).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect();
        assert!(text.contains("Connections"));
        assert!(text.contains("10.0.0.9  printer"));
    }
}
