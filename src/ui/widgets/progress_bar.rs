use ratatui::style::Color;
use ratatui::text::{Line, Span};

/// Reusable percentage progress bar.
///
/// Transfers report an already-computed integer percentage, so the widget
/// renders straight from it.
pub struct ProgressBar {
    width: usize,
}

impl ProgressBar {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Renders the bar as a Line; `pct` is clamped to 100.
    pub fn render(&self, pct: u8, color: Color) -> Line<'static> {
        let pct = pct.min(100) as usize;
        let filled = (self.width * pct) / 100;
        let empty = self.width.saturating_sub(filled);

        Line::from(vec![
            Span::raw("["),
            Span::styled("#".repeat(filled), color),
            Span::raw("-".repeat(empty)),
            Span::raw(format!("] {}%", pct)),
        ])
    }
}
