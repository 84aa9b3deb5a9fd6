//! User-facing notification line for the status bar.
//!
//! Concise, level-aware notifications with auto-expiry. All user-visible
//! outcome messages go through here — verbose details belong in `tracing`
//! logs, not in the status bar. Only one notification is active at a time
//! (newest wins); expired notifications disappear and the status bar falls
//! back to contextual help text.

use crate::core::config::{NOTIFY_TTL_ERROR, NOTIFY_TTL_INFO, NOTIFY_TTL_WARNING};
use ratatui::style::Color;
use std::time::{Duration, Instant};

// ── Level ────────────────────────────────────────────────────────────────────

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Neutral informational message (e.g. "Connecting…").
    Info,
    /// Positive outcome (e.g. "Upload complete").
    Success,
    /// Non-critical issue (e.g. "An operation is already running").
    Warning,
    /// Actionable error (e.g. "Transfer failed").
    Error,
}

impl NotifyLevel {
    /// Terminal color for the notification text.
    pub fn color(self) -> Color {
        match self {
            NotifyLevel::Info => Color::Cyan,
            NotifyLevel::Success => Color::Green,
            NotifyLevel::Warning => Color::Yellow,
            NotifyLevel::Error => Color::Red,
        }
    }

    fn ttl(self) -> Duration {
        match self {
            NotifyLevel::Info | NotifyLevel::Success => NOTIFY_TTL_INFO,
            NotifyLevel::Warning => NOTIFY_TTL_WARNING,
            NotifyLevel::Error => NOTIFY_TTL_ERROR,
        }
    }
}

// ── Notification ─────────────────────────────────────────────────────────────

/// A single user-facing notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
    created_at: Instant,
}

impl Notification {
    fn new(level: NotifyLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Instant::now(),
        }
    }

    /// Whether this notification should no longer be shown.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.level.ttl()
    }
}

// ── Manager ──────────────────────────────────────────────────────────────────

/// Holds the single active user-facing notification.
#[derive(Default)]
pub struct NotifyManager {
    current: Option<Notification>,
}

impl NotifyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.current = Some(Notification::new(NotifyLevel::Info, message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.current = Some(Notification::new(NotifyLevel::Success, message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.current = Some(Notification::new(NotifyLevel::Warning, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.current = Some(Notification::new(NotifyLevel::Error, message));
    }

    /// The active notification, or `None` if expired / absent.
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref().filter(|n| !n.is_expired())
    }

    /// Explicitly dismiss the current notification.
    pub fn clear(&mut self) {
        self.current = None;
    }
}
