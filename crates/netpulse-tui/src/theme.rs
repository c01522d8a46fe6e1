//! Colors and styles. Screens ask for a role (`table_row`, `muted`,
//! `severity_style`) rather than a raw color wherever one exists.

use ratatui::style::{Color, Modifier, Style};

use netpulse_core::Severity;

pub const PULSE_TEAL: Color = Color::Rgb(94, 234, 212); // #5eead4
pub const SIGNAL_VIOLET: Color = Color::Rgb(167, 139, 250); // #a78bfa
pub const FLARE_PINK: Color = Color::Rgb(244, 114, 182); // #f472b6
pub const AMBER: Color = Color::Rgb(251, 191, 36); // #fbbf24
pub const OK_GREEN: Color = Color::Rgb(74, 222, 128); // #4ade80
pub const ALERT_RED: Color = Color::Rgb(248, 113, 113); // #f87171

pub const TEXT: Color = Color::Rgb(203, 213, 225); // #cbd5e1
pub const SLATE: Color = Color::Rgb(100, 116, 139); // #64748b
pub const BG_SELECTED: Color = Color::Rgb(30, 41, 59); // #1e293b
pub const BG_PANEL: Color = Color::Rgb(15, 23, 42); // #0f172a
pub const BG_BANNER: Color = Color::Rgb(127, 29, 29); // #7f1d1d

/// Protocol bars take these in backend order, wrapping around.
pub const PROTOCOL_SERIES: &[Color] = &[PULSE_TEAL, FLARE_PINK, SIGNAL_VIOLET, OK_GREEN, AMBER];

pub fn title_style() -> Style {
    Style::default().fg(PULSE_TEAL).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(SIGNAL_VIOLET)
}

pub fn border_default() -> Style {
    Style::default().fg(SLATE)
}

pub fn table_header() -> Style {
    Style::default().fg(PULSE_TEAL).add_modifier(Modifier::BOLD)
}

pub fn table_row() -> Style {
    Style::default().fg(TEXT)
}

pub fn table_selected() -> Style {
    Style::default()
        .fg(PULSE_TEAL)
        .bg(BG_SELECTED)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_active() -> Style {
    Style::default()
        .fg(PULSE_TEAL)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn tab_inactive() -> Style {
    Style::default().fg(SLATE)
}

pub fn key_hint() -> Style {
    Style::default().fg(SLATE)
}

pub fn key_hint_key() -> Style {
    Style::default().fg(SIGNAL_VIOLET).add_modifier(Modifier::BOLD)
}

/// Acknowledged alerts, empty states, secondary labels.
pub fn muted() -> Style {
    Style::default().fg(SLATE)
}

pub fn link_up() -> Style {
    Style::default().fg(OK_GREEN)
}

pub fn link_down() -> Style {
    Style::default().fg(ALERT_RED).add_modifier(Modifier::BOLD)
}

pub fn link_pending() -> Style {
    Style::default().fg(AMBER)
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::High => ALERT_RED,
        Severity::Medium => AMBER,
        Severity::Low => PULSE_TEAL,
    }
}

/// High severity is also bold so it survives monochrome terminals.
pub fn severity_style(severity: Severity) -> Style {
    let style = Style::default().fg(severity_color(severity));
    match severity {
        Severity::High => style.add_modifier(Modifier::BOLD),
        Severity::Medium | Severity::Low => style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_distinguishable() {
        let colors = [Severity::High, Severity::Medium, Severity::Low].map(severity_color);
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert!(severity_style(Severity::High).add_modifier.contains(Modifier::BOLD));
        assert!(!severity_style(Severity::Low).add_modifier.contains(Modifier::BOLD));
    }
}
