//! Remote-service boundary.
//!
//! The rest of the application never talks to a messaging SDK directly; it
//! goes through the traits below, which capture exactly what the service is
//! assumed to provide: connect/authorize, send a file to a chat, fetch a
//! message by identifier, download a message's media, and resolve a
//! human-given chat identifier. Transfers report progress through a
//! `(bytes_done, bytes_total)` callback and failures through [`RemoteError`].
//!
//! Implementations:
//! - `memory` — in-process loopback vault, compiled for the test suite.
//! - `telegram` — MTProto adapter over grammers, behind the `telegram`
//!   feature.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::core::session::Credentials;

#[cfg(test)]
pub mod memory;
#[cfg(feature = "telegram")]
pub mod telegram;

/// Progress callback invoked during a transfer: `(bytes_done, bytes_total)`.
pub type ProgressFn = Box<dyn FnMut(u64, u64) + Send>;

// ── Handles ──────────────────────────────────────────────────────────────────

/// Opaque reference to a chat that can receive file uploads.
///
/// `token` is a backend-specific packed representation; callers only ever
/// hand it back to the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub id: i64,
    pub title: String,
    pub token: String,
}

/// A message fetched from the remote service.
#[derive(Debug, Clone)]
pub struct RemoteMessage {
    pub id: i64,
    pub media: Option<RemoteMedia>,
}

/// Reference to a message's attached media, downloadable by the backend
/// that produced it.
#[derive(Debug, Clone)]
pub struct RemoteMedia {
    /// Attachment size in bytes; 0 when the backend cannot tell.
    pub size: u64,
    pub token: String,
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Failures at the remote boundary.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not authorized with the remote service")]
    NotAuthorized,
    #[error("cannot resolve destination '{0}'")]
    UnknownDestination(String),
    #[error("message {0} not found in the storage chat")]
    MessageNotFound(i64),
    #[error("message {0} has no attached file")]
    NoMedia(i64),
    #[error("remote backend unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    /// Whether this failure means "the requested thing does not exist", as
    /// opposed to a transport problem.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound(_) | Self::NoMedia(_))
    }
}

// ── Traits ───────────────────────────────────────────────────────────────────

/// A connected, authorized session with the remote service.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Resolve a user-supplied identifier (numeric ID, username, or the
    /// literal self-chat alias `"me"`) to a destination handle.
    async fn resolve_destination(&self, query: &str) -> Result<Destination, RemoteError>;

    /// Upload a local file as an attachment to `dest` with the given
    /// caption. Returns the identifier of the created message.
    async fn send_file(
        &self,
        dest: &Destination,
        path: &Path,
        caption: &str,
        progress: ProgressFn,
    ) -> Result<i64, RemoteError>;

    /// Fetch a message by identifier from `dest`.
    async fn fetch_message(
        &self,
        dest: &Destination,
        message_id: i64,
    ) -> Result<RemoteMessage, RemoteError>;

    /// Stream a message's media to `target`. Returns the final local path.
    async fn download_media(
        &self,
        media: &RemoteMedia,
        target: &Path,
        progress: ProgressFn,
    ) -> Result<PathBuf, RemoteError>;
}

/// Outcome of a connect attempt.
pub enum Connection {
    /// The stored session was already authorized.
    Ready(Arc<dyn RemoteStorage>),
    /// The service wants an out-of-band authorization code.
    CodeRequired(Box<dyn PendingAuthorization>),
}

/// A half-open session waiting for the user to type the code the service
/// sent them out-of-band.
#[async_trait]
pub trait PendingAuthorization: Send {
    async fn submit_code(
        self: Box<Self>,
        code: &str,
    ) -> Result<Arc<dyn RemoteStorage>, RemoteError>;
}

/// Factory establishing sessions from credentials.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Connection, RemoteError>;
}
