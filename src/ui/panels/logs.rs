use crate::ui::traits::{Action, Handler};
use crate::utils::log_buffer::LogBuffer;
use crate::workers::app::{App, Mode};
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

pub struct LogsPanel;

impl Default for LogsPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl LogsPanel {
    pub fn new() -> Self {
        Self
    }

    pub fn render_with_buffer(
        &mut self,
        f: &mut Frame,
        app: &App,
        log_buffer: &LogBuffer,
        area: Rect,
    ) {
        let entries = log_buffer.entries();
        let total = entries.len();

        let visible_height = area.height.saturating_sub(2) as usize;

        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);

        let items: Vec<ListItem> = entries
            .iter()
            .skip(scroll)
            .take(visible_height)
            .map(|entry| {
                let (level_color, level_str) = match entry.level {
                    tracing::Level::ERROR => (Color::Red, "ERROR"),
                    tracing::Level::WARN => (Color::Yellow, " WARN"),
                    tracing::Level::INFO => (Color::Green, " INFO"),
                    tracing::Level::DEBUG => (Color::DarkGray, "DEBUG"),
                    tracing::Level::TRACE => (Color::Indexed(240), "TRACE"),
                };

                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!(" {} ", entry.timestamp),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{} ", level_str),
                        Style::default()
                            .fg(level_color)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(entry.message.clone()),
                ]))
            })
            .collect();

        let title = format!(" Logs ({}) ", total);
        let log_list = List::new(items).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
        f.render_widget(log_list, area);
    }
}

impl Handler for LogsPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Action {
        match key {
            KeyCode::Esc => {
                app.log_scroll = 0;
                Action::SwitchMode(Mode::Files)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.log_scroll = app.log_scroll.saturating_sub(1);
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.log_scroll = app.log_scroll.saturating_add(1);
                Action::None
            }
            KeyCode::PageUp => {
                app.log_scroll = app.log_scroll.saturating_sub(10);
                Action::None
            }
            KeyCode::PageDown => {
                app.log_scroll = app.log_scroll.saturating_add(10);
                Action::None
            }
            KeyCode::Home => {
                app.log_scroll = 0;
                Action::None
            }
            _ => Action::None,
        }
    }
}
