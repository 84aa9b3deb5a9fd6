use crate::core::session::Credentials;
use crate::ui::popups::{InputPopup, Popup};
use crate::ui::traits::{Action, Component, Handler};
use crate::workers::app::App;
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Connection and storage-chat setup panel.
pub struct ConnectPanel;

impl Default for ConnectPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectPanel {
    pub fn new() -> Self {
        Self
    }

    fn status_line(app: &App) -> Line<'static> {
        let (text, color) = if app.connected() {
            ("Connected".to_string(), Color::Green)
        } else if app.pending_auth.is_some() {
            (
                "Waiting for authorization code (press a to enter it)".to_string(),
                Color::Yellow,
            )
        } else {
            ("Disconnected".to_string(), Color::DarkGray)
        };
        Line::from(vec![
            Span::styled("  Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(text, Style::default().fg(color)),
        ])
    }

    fn chat_line(app: &App) -> Line<'static> {
        let value_style = if app.editing_destination {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };

        let value = match (&app.destination, app.editing_destination) {
            (_, true) => format!("{}_", app.destination_input),
            (Some(dest), false) => format!("{} (id {})", dest.title, dest.id),
            (None, false) if app.destination_input.is_empty() => "<not set>".to_string(),
            (None, false) => app.destination_input.clone(),
        };

        Line::from(vec![
            Span::styled("  Storage chat: ", Style::default().fg(Color::DarkGray)),
            Span::styled(value, value_style),
        ])
    }
}

impl Component for ConnectPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let credentials = match Credentials::from_env() {
            Ok(c) => Line::from(vec![
                Span::styled("  Credentials: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!(
                        "API_ID {} / API_HASH {}",
                        c.api_id,
                        "*".repeat(c.api_hash.len().min(8))
                    ),
                    Style::default().fg(Color::Green),
                ),
            ]),
            Err(e) => Line::from(vec![
                Span::styled("  Credentials: ", Style::default().fg(Color::DarkGray)),
                Span::styled(e.to_string(), Style::default().fg(Color::Red)),
            ]),
        };

        let hint = if app.editing_destination {
            "  Type the chat ID, @username, or \"me\" \u{00b7} Enter to resolve \u{00b7} Esc to stop editing"
        } else if app.connected() {
            "  e: edit storage chat \u{00b7} 2: files \u{00b7} 3: logs \u{00b7} q: quit"
        } else {
            "  c: connect \u{00b7} 3: logs \u{00b7} q: quit"
        };

        let lines = vec![
            Line::from(""),
            credentials,
            Self::status_line(app),
            Self::chat_line(app),
            Line::from(""),
            Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
        ];

        let block = Paragraph::new(lines).block(
            Block::default()
                .title(" Connect ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        f.render_widget(block, area);
    }
}

impl Handler for ConnectPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Action {
        if app.editing_destination {
            match key {
                KeyCode::Enter => {
                    app.editing_destination = false;
                    app.start_resolve();
                }
                KeyCode::Esc => app.editing_destination = false,
                KeyCode::Backspace => {
                    app.destination_input.pop();
                }
                KeyCode::Char(c) => app.destination_input.push(c),
                _ => {}
            }
            return Action::None;
        }

        match key {
            KeyCode::Char('c') => app.start_connect(),
            KeyCode::Char('a') if app.pending_auth.is_some() => {
                app.popup = Some(Popup::Input(InputPopup::auth_code()));
            }
            KeyCode::Char('e') | KeyCode::Enter if app.connected() => {
                app.editing_destination = true;
            }
            _ => {}
        }
        Action::None
    }
}
