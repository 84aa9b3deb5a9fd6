//! Tracing sinks for a full-screen terminal application.
//!
//! A plain `fmt` layer writing to stderr would corrupt the ratatui display,
//! so log events are captured twice instead:
//! - `BufferLayer` keeps the most recent entries in an in-memory ring
//!   buffer rendered by the Logs panel.
//! - `FileLogLayer` appends the complete history, with full timestamps, to
//!   a log file under the data directory.

use crate::core::config::MAX_LOG_ENTRIES;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

// ── Ring buffer ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

/// Shared in-memory ring buffer of recent log entries.
#[derive(Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }
}

// ── Event flattening ─────────────────────────────────────────────────────────

/// Collects an event's fields into one display line, `message` first.
struct MessageVisitor {
    message: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: String) {
        if name == "message" {
            if self.message.is_empty() {
                self.message = value;
            } else {
                self.message = format!("{value}, {}", self.message);
            }
        } else if self.message.is_empty() {
            self.message = format!("{name}={value}");
        } else {
            self.message.push_str(&format!(", {name}={value}"));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push_field(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push_field(field.name(), value.to_string());
    }
}

fn flatten(event: &Event<'_>) -> (Level, String) {
    let meta = event.metadata();
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);

    let message = if visitor.message.is_empty() {
        meta.target().to_string()
    } else {
        format!("{}: {}", meta.target(), visitor.message)
    };
    (*meta.level(), message)
}

// ── Buffer layer ─────────────────────────────────────────────────────────────

/// Tracing layer feeding the in-memory ring buffer.
pub struct BufferLayer {
    buffer: LogBuffer,
}

impl BufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let (level, message) = flatten(event);
        self.buffer.push(LogEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message,
        });
    }
}

// ── File layer ───────────────────────────────────────────────────────────────

/// Tracing layer appending every event to a log file (RFC 3339 timestamps).
pub struct FileLogLayer {
    writer: Arc<Mutex<File>>,
}

impl FileLogLayer {
    /// Open (or create) the log file in append mode, creating parent
    /// directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(file)),
        })
    }
}

impl<S: Subscriber> Layer<S> for FileLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let (level, message) = flatten(event);
        let line = format!(
            "{} {:5} {}\n",
            chrono::Local::now().to_rfc3339(),
            level,
            message
        );
        if let Ok(mut file) = self.writer.lock() {
            let _ = file.write_all(line.as_bytes());
        }
    }
}
