//! Error taxonomy for user-triggered operations.
//!
//! Every failure surfaced to the user is a plain human-readable string, but
//! internally each failure carries one of a small closed set of kinds so the
//! controller can distinguish, e.g., "message not found" from a transport
//! failure without parsing message text.

use thiserror::Error;

/// Errors detected before any operation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("API_ID is not set (environment or .env)")]
    MissingApiId,
    #[error("API_ID must be a number")]
    InvalidApiId,
    #[error("API_HASH is not set (environment or .env)")]
    MissingApiHash,
}

/// Classification of a failed transfer or session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The requested remote message or its media does not exist.
    NotFound,
    /// Network or remote-service failure.
    Transport,
    /// Local filesystem failure.
    Io,
    /// The session is not (or no longer) authorized.
    Unauthorized,
}

/// Terminal failure of a worker operation: a kind plus the message shown
/// verbatim to the user.
#[derive(Debug, Clone)]
pub struct OperationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(err: &std::io::Error, context: &str) -> Self {
        Self::new(FailureKind::Io, format!("{context}: {err}"))
    }
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
