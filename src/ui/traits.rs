use crate::workers::app::{App, Mode};
use crossterm::event::KeyCode;
use ratatui::{Frame, layout::Rect};

/// Core trait for UI panels that can be rendered.
pub trait Component {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect);
}

/// Trait for panels that handle keyboard input.
///
/// Panels mutate the [`App`] directly (starting operations, moving
/// selections) and return an [`Action`] only for concerns the main loop
/// owns, like switching panels.
pub trait Handler {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Action;
}

/// Actions returned from key handlers to the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SwitchMode(Mode),
    None,
}
