//! Delete confirmation popup.
//!
//! Deleting only removes the local index entry — the remote message keeps
//! the file — and the popup says so, since "delete" would otherwise read as
//! destructive.

use super::{PopupOutcome, popup_area};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct ConfirmPopup {
    pub file_name: String,
    /// 0 = Remove, 1 = Cancel.
    pub focus: usize,
}

impl ConfirmPopup {
    pub fn delete(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            // Default to the safe choice.
            focus: 1,
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> PopupOutcome {
        match key {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.focus = 1 - self.focus;
                PopupOutcome::Pending
            }
            KeyCode::Enter if self.focus == 0 => PopupOutcome::Submit,
            KeyCode::Enter | KeyCode::Esc => PopupOutcome::Cancel,
            _ => PopupOutcome::Pending,
        }
    }

    fn buttons(&self) -> Vec<Span<'static>> {
        let remove_style = if self.focus == 0 {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Black).bg(Color::DarkGray)
        };
        let cancel_style = if self.focus == 1 {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Black).bg(Color::DarkGray)
        };
        vec![
            Span::raw("  "),
            Span::styled(" Remove ", remove_style),
            Span::raw("  "),
            Span::styled(" Cancel ", cancel_style),
        ]
    }

    pub fn render(&self, f: &mut Frame) {
        let area = popup_area(f.area(), 8);

        let lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  Remove: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    self.file_name.clone(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(Span::styled(
                "  Only the local entry is removed; the uploaded",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "  file stays in the storage chat.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(self.buttons()),
        ];

        let popup = Paragraph::new(lines).block(
            Block::default()
                .title(" Remove From Index ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );

        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}
