//! The trait shared by the five tab screens and the login overlay.

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::action::Action;

/// A screen owns its own view state. Data arrives through
/// [`update`](Component::update) as actions broadcast by the app; keys only
/// reach a screen while it is the active tab and no overlay is open.
pub trait Component: Send {
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    /// React to a dispatched action. A returned action is queued behind
    /// the one being processed.
    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect);

    /// Tab switches toggle this so screens can dim their borders.
    fn set_focused(&mut self, _focused: bool) {}
}
