pub mod confirm;
pub mod input;

pub use confirm::ConfirmPopup;
pub use input::{InputKind, InputPopup};

use ratatui::layout::Rect;

/// The single modal popup the UI can show (one at a time, like the
/// operations it gates).
pub enum Popup {
    Input(InputPopup),
    Confirm(ConfirmPopup),
}

/// Result of feeding a key to a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    /// Still open.
    Pending,
    /// The user confirmed; the caller consumes the popup's value.
    Submit,
    /// The user backed out.
    Cancel,
}

/// Centered popup area.
pub(crate) fn popup_area(area: Rect, height: u16) -> Rect {
    Rect {
        x: area.width / 4,
        y: (area.height / 3).min(area.height.saturating_sub(height)),
        width: area.width / 2,
        height: height.min(area.height),
    }
}
