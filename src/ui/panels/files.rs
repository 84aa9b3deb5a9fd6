use crate::ui::helpers::{format_file_size, format_upload_date, truncate_filename};
use crate::ui::popups::{InputPopup, Popup};
use crate::ui::traits::{Action, Component, Handler};
use crate::workers::app::App;
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

/// File browser: virtual folder tree beside the uploaded-file listing.
///
/// Folders are session-local labels (the index itself is flat); every
/// record is listed under "All Files".
pub struct FilesPanel;

impl Default for FilesPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesPanel {
    pub fn new() -> Self {
        Self
    }

    fn render_folders(&self, f: &mut Frame, app: &App, area: Rect) {
        let mut items: Vec<ListItem> = vec![folder_item("All Files", app.selected_folder == 0)];
        items.extend(
            app.folders
                .iter()
                .enumerate()
                .map(|(i, name)| folder_item(name, app.selected_folder == i + 1)),
        );

        let border = if app.folder_pane_focused {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        let list = List::new(items).block(
            Block::default()
                .title(" Folders ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        f.render_widget(list, area);
    }

    fn render_files(&self, f: &mut Frame, app: &App, area: Rect) {
        let records = app.store.records();
        let visible_height = area.height.saturating_sub(2) as usize;

        // Keep the cursor in view.
        let scroll = app
            .selected_file
            .saturating_sub(visible_height.saturating_sub(1));

        let items: Vec<ListItem> = records
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible_height)
            .map(|(i, record)| {
                let selected = i == app.selected_file && !app.folder_pane_focused;
                let name_style = if selected {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!(" {:<32}", truncate_filename(&record.file_name, 30)),
                        name_style,
                    ),
                    Span::styled(
                        format!("{:>10}  ", format_file_size(record.file_size)),
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled(
                        format_upload_date(&record.upload_date),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let chat = app
            .destination
            .as_ref()
            .map(|d| d.title.clone())
            .unwrap_or_else(|| "no chat".to_string());
        let border = if app.folder_pane_focused {
            Color::DarkGray
        } else {
            Color::Cyan
        };
        let list = List::new(items).block(
            Block::default()
                .title(format!(" Files ({}) \u{2014} {} ", records.len(), chat))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        f.render_widget(list, area);
    }
}

fn folder_item(name: &str, selected: bool) -> ListItem<'static> {
    let style = if selected {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow)
    };
    ListItem::new(Line::from(Span::styled(format!(" {name}"), style)))
}

impl Component for FilesPanel {
    fn render(&mut self, f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
            .split(area);

        self.render_folders(f, app, chunks[0]);
        self.render_files(f, app, chunks[1]);
    }
}

impl Handler for FilesPanel {
    fn handle_key(&mut self, app: &mut App, key: KeyCode) -> Action {
        match key {
            KeyCode::Tab => {
                app.folder_pane_focused = !app.folder_pane_focused;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if app.folder_pane_focused {
                    app.selected_folder = app.selected_folder.saturating_sub(1);
                } else {
                    app.selected_file = app.selected_file.saturating_sub(1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if app.folder_pane_focused {
                    let max = app.folders.len();
                    app.selected_folder = (app.selected_folder + 1).min(max);
                } else if !app.store.is_empty() {
                    app.selected_file = (app.selected_file + 1).min(app.store.len() - 1);
                }
            }
            KeyCode::Char('u') => {
                app.popup = Some(Popup::Input(InputPopup::upload_path()));
            }
            KeyCode::Char('d') | KeyCode::Enter if !app.folder_pane_focused => {
                match app.selected_record().map(|r| r.file_name.clone()) {
                    Some(name) => {
                        app.popup = Some(Popup::Input(InputPopup::save_path(&name)));
                    }
                    None => app.notify.warn("No file selected"),
                }
            }
            KeyCode::Char('n') => {
                app.popup = Some(Popup::Input(InputPopup::new_folder()));
            }
            KeyCode::Char('x') | KeyCode::Delete if !app.folder_pane_focused => {
                app.request_delete();
            }
            _ => {}
        }
        Action::None
    }
}
