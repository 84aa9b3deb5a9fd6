//! Single-line text entry popup.
//!
//! Covers every text the app asks for: the authorization code, the local
//! path of a file to upload, the save path of a download, and new virtual
//! folder names. A TUI has no OS file dialog, so paths are typed (or
//! pasted) directly.

use super::{PopupOutcome, popup_area};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

/// What the entered text will be used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    AuthCode,
    UploadPath,
    SavePath { file_name: String },
    NewFolder,
}

pub struct InputPopup {
    pub kind: InputKind,
    pub buffer: String,
}

impl InputPopup {
    pub fn auth_code() -> Self {
        Self {
            kind: InputKind::AuthCode,
            buffer: String::new(),
        }
    }

    pub fn upload_path() -> Self {
        Self {
            kind: InputKind::UploadPath,
            buffer: String::new(),
        }
    }

    /// Save-path entry, prefilled with the record's file name.
    pub fn save_path(file_name: &str) -> Self {
        Self {
            kind: InputKind::SavePath {
                file_name: file_name.to_string(),
            },
            buffer: file_name.to_string(),
        }
    }

    pub fn new_folder() -> Self {
        Self {
            kind: InputKind::NewFolder,
            buffer: String::new(),
        }
    }

    fn title(&self) -> &'static str {
        match self.kind {
            InputKind::AuthCode => " Authorization Code ",
            InputKind::UploadPath => " Upload File ",
            InputKind::SavePath { .. } => " Save As ",
            InputKind::NewFolder => " New Folder ",
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            InputKind::AuthCode => "Code sent to your account:",
            InputKind::UploadPath => "Path of the file to upload:",
            InputKind::SavePath { .. } => "Save the download to:",
            InputKind::NewFolder => "Folder name:",
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> PopupOutcome {
        match key {
            KeyCode::Enter => PopupOutcome::Submit,
            KeyCode::Esc => PopupOutcome::Cancel,
            KeyCode::Backspace => {
                self.buffer.pop();
                PopupOutcome::Pending
            }
            KeyCode::Char(c) => {
                self.buffer.push(c);
                PopupOutcome::Pending
            }
            _ => PopupOutcome::Pending,
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let area = popup_area(f.area(), 7);

        let lines = vec![
            Line::from(""),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(self.label(), Style::default().fg(Color::DarkGray)),
            ]),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    format!("{}_", self.buffer),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "  Enter to confirm \u{00b7} Esc to cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let popup = Paragraph::new(lines).block(
            Block::default()
                .title(self.title())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}
