//! Single-line text fields on top of `tui_input::Input`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use tui_input::{Input, InputRequest};

use crate::theme;

/// Map an editing key to an input request. Keys that do not edit text
/// (Enter, Esc, Tab, ...) return `None` and stay with the caller.
pub fn request_for(key: KeyEvent) -> Option<InputRequest> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('u') if ctrl => Some(InputRequest::DeleteLine),
        KeyCode::Char('w') if ctrl => Some(InputRequest::DeletePrevWord),
        KeyCode::Char('a') if ctrl => Some(InputRequest::GoToStart),
        KeyCode::Char('e') if ctrl => Some(InputRequest::GoToEnd),
        KeyCode::Char(c) if !ctrl => Some(InputRequest::InsertChar(c)),
        KeyCode::Backspace => Some(InputRequest::DeletePrevChar),
        KeyCode::Delete => Some(InputRequest::DeleteNextChar),
        KeyCode::Left => Some(InputRequest::GoToPrevChar),
        KeyCode::Right => Some(InputRequest::GoToNextChar),
        KeyCode::Home => Some(InputRequest::GoToStart),
        KeyCode::End => Some(InputRequest::GoToEnd),
        _ => None,
    }
}

/// Apply `key` to `input`. Returns whether the text changed.
pub fn edit(input: &mut Input, key: KeyEvent) -> bool {
    request_for(key)
        .and_then(|req| input.handle(req))
        .is_some_and(|changed| changed.value)
}

/// Render `label: value` on one line. `masked` replaces every character
/// with a bullet. The terminal cursor is placed only when `focused`.
pub fn render_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    input: &Input,
    masked: bool,
    focused: bool,
) {
    let label_width = u16::try_from(label.chars().count() + 2).unwrap_or(u16::MAX);
    let field_width = usize::from(area.width.saturating_sub(label_width).max(1));
    let scroll = input.visual_scroll(field_width);

    let text: String = if masked {
        "•".repeat(input.value().chars().count())
    } else {
        input.value().to_owned()
    };
    let visible: String = text.chars().skip(scroll).take(field_width).collect();

    let value_style = if focused {
        Style::default().fg(theme::PULSE_TEAL)
    } else {
        Style::default().fg(theme::TEXT)
    };
    let label_style = if focused {
        theme::key_hint_key()
    } else {
        theme::key_hint()
    };

    let line = Line::from(vec![
        Span::styled(format!("{label}: "), label_style),
        Span::styled(visible, value_style),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    if focused {
        let offset = input.visual_cursor().saturating_sub(scroll);
        let x = area
            .x
            .saturating_add(label_width)
            .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX));
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
    }
}
