//! Row selection for table screens (j/k, g/G, Ctrl+d/u).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::TableState;

const PAGE: usize = 10;

/// Move the selection of a `len`-row table according to `key`.
/// Returns `false` if `key` is not a navigation key.
pub fn navigate(state: &mut TableState, len: usize, key: KeyEvent) -> bool {
    let current = state.selected().unwrap_or(0);
    let last = len.saturating_sub(1);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    let target = match key.code {
        KeyCode::Char('d') if ctrl => current.saturating_add(PAGE).min(last),
        KeyCode::Char('u') if ctrl => current.saturating_sub(PAGE),
        KeyCode::Char('j') | KeyCode::Down => (current + 1).min(last),
        KeyCode::Char('k') | KeyCode::Up => current.saturating_sub(1),
        KeyCode::Char('g') | KeyCode::Home => 0,
        KeyCode::Char('G') | KeyCode::End => last,
        KeyCode::PageDown => current.saturating_add(PAGE).min(last),
        KeyCode::PageUp => current.saturating_sub(PAGE),
        _ => return false,
    };
    state.select(if len == 0 { None } else { Some(target) });
    true
}

/// Keep the selection inside a table that now has `len` rows.
pub fn clamp(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), n) if i >= n => state.select(Some(n - 1)),
        _ => {}
    }
}
