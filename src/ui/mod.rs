//! Terminal UI: panel layout, key routing, and the foreground event loop.
//!
//! The loop is the application controller's heartbeat: every tick it drains
//! worker channels (the only place store mutations happen), redraws, and
//! routes one key event. Popups capture keys first; global keys are ignored
//! while a text field is being edited.

pub mod helpers;
pub mod notify;
pub mod panels;
pub mod popups;
pub mod traits;
pub mod widgets;

use crate::core::config::TICK_INTERVAL;
use crate::ui::panels::{ConnectPanel, FilesPanel, LogsPanel};
use crate::ui::popups::{InputKind, InputPopup, Popup, PopupOutcome};
use crate::ui::traits::{Action, Component, Handler};
use crate::ui::widgets::ProgressBar;
use crate::utils::log_buffer::LogBuffer;
use crate::utils::sos::SignalOfStop;
use crate::workers::app::{App, Mode};
use crate::workers::args::Args;
use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::path::PathBuf;

/// Set up the terminal, run the event loop, and restore the terminal even
/// when the loop errors.
pub fn run(args: Args, sos: SignalOfStop, log_buffer: LogBuffer) -> Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::from_data_dir();
    if let Some(chat) = &args.chat {
        app.destination_input = chat.clone();
    }

    let result = event_loop(&mut terminal, &mut app, &sos, &log_buffer);

    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    sos: &SignalOfStop,
    log_buffer: &LogBuffer,
) -> Result<()> {
    let mut connect_panel = ConnectPanel::new();
    let mut files_panel = FilesPanel::new();
    let mut logs_panel = LogsPanel::new();

    loop {
        app.poll_events();
        if sos.cancelled() || app.should_quit {
            return Ok(());
        }

        terminal.draw(|f| {
            render(
                f,
                app,
                &mut connect_panel,
                &mut files_panel,
                &mut logs_panel,
                log_buffer,
            )
        })?;

        if crossterm::event::poll(TICK_INTERVAL)?
            && let Event::Key(key) = crossterm::event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(
                app,
                key.code,
                &mut connect_panel,
                &mut files_panel,
                &mut logs_panel,
            );
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn render(
    f: &mut Frame,
    app: &App,
    connect_panel: &mut ConnectPanel,
    files_panel: &mut FilesPanel,
    logs_panel: &mut LogsPanel,
    log_buffer: &LogBuffer,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(4),
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);
    match app.mode {
        Mode::Connect => connect_panel.render(f, app, chunks[1]),
        Mode::Files => files_panel.render(f, app, chunks[1]),
        Mode::Logs => logs_panel.render_with_buffer(f, app, log_buffer, chunks[1]),
    }
    render_status(f, app, chunks[2]);

    match &app.popup {
        Some(Popup::Input(input)) => input.render(f),
        Some(Popup::Confirm(confirm)) => confirm.render(f),
        None => {}
    }
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, mode) in [Mode::Connect, Mode::Files, Mode::Logs].iter().enumerate() {
        let style = if *mode == app.mode {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, mode.label()), style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let first = if let Some(busy) = &app.busy {
        Line::from(Span::styled(
            format!(" {}", busy.label()),
            Style::default().fg(Color::Cyan),
        ))
    } else if let Some(n) = app.notify.current() {
        Line::from(Span::styled(
            format!(" {}", n.message),
            Style::default().fg(n.level.color()),
        ))
    } else {
        Line::from(Span::styled(
            " 1/2/3: switch panel \u{00b7} q: quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let second = match app.progress {
        Some(pct) => {
            let width = area.width.saturating_sub(10) as usize;
            ProgressBar::new(width.max(10)).render(pct, Color::Green)
        }
        None => Line::from(""),
    };

    let status = Paragraph::new(vec![first, second]).block(
        Block::default()
            .title(" Status ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(status, area);
}

// ── Key routing ──────────────────────────────────────────────────────────────

fn handle_key(
    app: &mut App,
    code: KeyCode,
    connect_panel: &mut ConnectPanel,
    files_panel: &mut FilesPanel,
    logs_panel: &mut LogsPanel,
) {
    // A modal popup captures everything.
    if let Some(popup) = app.popup.take() {
        match popup {
            Popup::Input(mut input) => match input.handle_key(code) {
                PopupOutcome::Pending => app.popup = Some(Popup::Input(input)),
                PopupOutcome::Cancel => {}
                PopupOutcome::Submit => dispatch_input(app, input),
            },
            Popup::Confirm(mut confirm) => match confirm.handle_key(code) {
                PopupOutcome::Pending => app.popup = Some(Popup::Confirm(confirm)),
                PopupOutcome::Cancel => {}
                PopupOutcome::Submit => app.delete_selected(),
            },
        }
        return;
    }

    // Global keys, unless a text field is capturing input.
    let editing = app.editing_destination && app.mode == Mode::Connect;
    if !editing {
        match code {
            KeyCode::Char('q') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('1') => {
                app.mode = Mode::Connect;
                return;
            }
            KeyCode::Char('2') => {
                app.mode = Mode::Files;
                return;
            }
            KeyCode::Char('3') => {
                app.mode = Mode::Logs;
                return;
            }
            _ => {}
        }
    }

    let action = match app.mode {
        Mode::Connect => connect_panel.handle_key(app, code),
        Mode::Files => files_panel.handle_key(app, code),
        Mode::Logs => logs_panel.handle_key(app, code),
    };
    match action {
        Action::SwitchMode(mode) => app.mode = mode,
        Action::None => {}
    }
}

fn dispatch_input(app: &mut App, input: InputPopup) {
    let value = input.buffer.trim().to_string();
    match input.kind {
        InputKind::AuthCode => app.submit_auth_code(value),
        InputKind::UploadPath => {
            if value.is_empty() {
                app.notify.warn("Enter the path of the file to upload");
            } else {
                app.start_upload(PathBuf::from(value));
            }
        }
        InputKind::SavePath { file_name } => {
            if value.is_empty() {
                app.notify.warn(format!("Enter a save path for {file_name}"));
            } else {
                app.start_download(PathBuf::from(value));
            }
        }
        InputKind::NewFolder => app.create_folder(value),
    }
}
