//! Traffic screen: full-width throughput chart and protocol breakdown.

use std::sync::Arc;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use color_eyre::eyre::Result;
use netpulse_core::ViewModel;

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::charts::{self, TrafficSummary};
use crate::widgets::format;

pub struct TrafficScreen {
    focused: bool,
    view: Arc<ViewModel>,
}

impl TrafficScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            view: Arc::new(ViewModel::default()),
        }
    }

    fn summary_line(&self) -> Line<'static> {
        let Some(s) = TrafficSummary::of(&self.view.traffic) else {
            return Line::styled("  No samples yet", theme::muted());
        };
        let stat = |label: &'static str, value: f64| {
            [
                Span::styled(label, theme::key_hint()),
                Span::styled(format!("{} Mbps  ", format::mbps(value)), theme::key_hint_key()),
            ]
        };
        let mut spans = vec![Span::raw("  ")];
        spans.extend(stat("current ", s.current));
        spans.extend(stat("min ", s.min));
        spans.extend(stat("max ", s.max));
        spans.extend(stat("avg ", s.avg));
        spans.push(Span::styled(
            format!("{} samples", self.view.traffic.len()),
            theme::muted(),
        ));
        Line::from(spans)
    }
}

impl Component for TrafficScreen {
    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::ViewUpdated(view) = action {
            self.view = Arc::clone(view);
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let protocol_height =
            u16::try_from(self.view.protocols.len()).unwrap_or(u16::MAX).saturating_add(2);
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(protocol_height.max(3)),
        ])
        .split(area);

        frame.render_widget(Paragraph::new(self.summary_line()), layout[0]);

        let chart_block = Block::default()
            .title(" Throughput (Mbps) ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        charts::render_traffic(frame, layout[1], &self.view.traffic, chart_block);

        let proto_block = Block::default()
            .title(" Protocols ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        let inner_width = proto_block.inner(layout[2]).width;
        let body = if self.view.protocols.is_empty() {
            Paragraph::new("  No protocol data").style(theme::muted())
        } else {
            Paragraph::new(charts::protocol_lines(&self.view.protocols, inner_width))
        };
        frame.render_widget(body.block(proto_block), layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use netpulse_core::TrafficPoint;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn rendered(screen: &TrafficScreen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| screen.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    #[test]
    fn empty_view_renders_placeholders() {
        let text = rendered(&TrafficScreen::new());
        assert!(text.contains("No samples yet"));
        assert!(text.contains("Waiting for traffic samples"));
        assert!(text.contains("No protocol data"));
    }

    #[test]
    fn summary_reflects_samples() {
        let mut view = ViewModel::default();
        view.traffic = [2.0, 8.0, 5.0]
            .into_iter()
            .map(|value| TrafficPoint {
                timestamp: None,
                value,
            })
            .collect();
        view.protocols.insert("TCP".into(), 60.0);

        let mut screen = TrafficScreen::new();
        screen.update(&Action::ViewUpdated(Arc::new(view))).unwrap();
        let text = rendered(&screen);
        assert!(text.contains("current 5.00 Mbps"));
        assert!(text.contains("max 8.00 Mbps"));
        assert!(text.contains("3 samples"));
        assert!(text.contains("100.0%"));
    }
}
