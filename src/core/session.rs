//! Remote session management: connecting, interactive authorization, and
//! destination resolution.
//!
//! Each operation is one-shot: it runs on its own worker thread with a
//! private single-thread runtime and delivers exactly one terminal
//! [`SessionEvent`] over a channel the UI drains on its tick. The connected
//! session and destination handles are explicit values injected wherever
//! they are needed — no ambient client state.

use crate::core::error::ConfigError;
use crate::remote::{Connection, Destination, PendingAuthorization, RemoteConnector, RemoteStorage};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, channel};
use tracing::{info, warn};
use uuid::Uuid;

// ── Credentials ──────────────────────────────────────────────────────────────

/// Application identifier and secret for the remote service, sourced from
/// the process environment (a `.env` file is honored at startup).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
}

impl Credentials {
    /// Read `API_ID` / `API_HASH` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(std::env::var("API_ID").ok(), std::env::var("API_HASH").ok())
    }

    fn parse(api_id: Option<String>, api_hash: Option<String>) -> Result<Self, ConfigError> {
        let api_id = api_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingApiId)?;
        let api_id: i32 = api_id.trim().parse().map_err(|_| ConfigError::InvalidApiId)?;
        let api_hash = api_hash
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingApiHash)?;
        Ok(Self { api_id, api_hash })
    }
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Terminal outcome of a session operation. Exactly one is delivered per
/// spawned operation.
pub enum SessionEvent {
    /// Connect (or code submission) succeeded.
    Connected(Arc<dyn RemoteStorage>),
    /// The service wants the out-of-band authorization code.
    AuthorizationCodeRequired(Box<dyn PendingAuthorization>),
    /// A destination identifier was resolved.
    DestinationResolved(Destination),
    /// The operation failed; the message is shown to the user verbatim.
    Failed(String),
}

fn worker_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

// ── Operations ───────────────────────────────────────────────────────────────

/// Establish a session with the remote service.
pub fn spawn_connect(
    connector: Arc<dyn RemoteConnector>,
    credentials: Credentials,
) -> Receiver<SessionEvent> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let op = Uuid::new_v4();
        info!(event = "connect_started", op = %op, api_id = credentials.api_id, "Connecting to remote service");
        let outcome = match worker_runtime() {
            Ok(rt) => match rt.block_on(connector.connect(&credentials)) {
                Ok(Connection::Ready(remote)) => {
                    info!(event = "connect_ok", op = %op, "Session authorized");
                    SessionEvent::Connected(remote)
                }
                Ok(Connection::CodeRequired(pending)) => {
                    info!(event = "connect_code_required", op = %op, "Interactive authorization required");
                    SessionEvent::AuthorizationCodeRequired(pending)
                }
                Err(e) => {
                    warn!(event = "connect_failed", op = %op, error = %e, "Connect failed");
                    SessionEvent::Failed(e.to_string())
                }
            },
            Err(e) => SessionEvent::Failed(format!("cannot start worker runtime: {e}")),
        };
        let _ = tx.send(outcome);
    });
    rx
}

/// Submit the out-of-band authorization code for a half-open session.
pub fn spawn_submit_code(
    pending: Box<dyn PendingAuthorization>,
    code: String,
) -> Receiver<SessionEvent> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let op = Uuid::new_v4();
        info!(event = "sign_in_started", op = %op, "Submitting authorization code");
        let outcome = match worker_runtime() {
            Ok(rt) => match rt.block_on(pending.submit_code(&code)) {
                Ok(remote) => {
                    info!(event = "sign_in_ok", op = %op, "Session authorized");
                    SessionEvent::Connected(remote)
                }
                Err(e) => {
                    warn!(event = "sign_in_failed", op = %op, error = %e, "Authorization failed");
                    SessionEvent::Failed(e.to_string())
                }
            },
            Err(e) => SessionEvent::Failed(format!("cannot start worker runtime: {e}")),
        };
        let _ = tx.send(outcome);
    });
    rx
}

/// Resolve a user-supplied chat identifier to a destination handle.
pub fn spawn_resolve(remote: Arc<dyn RemoteStorage>, query: String) -> Receiver<SessionEvent> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let op = Uuid::new_v4();
        info!(event = "resolve_started", op = %op, query = %query, "Resolving destination");
        let outcome = match worker_runtime() {
            Ok(rt) => match rt.block_on(remote.resolve_destination(&query)) {
                Ok(dest) => {
                    info!(event = "resolve_ok", op = %op, id = dest.id, title = %dest.title, "Destination resolved");
                    SessionEvent::DestinationResolved(dest)
                }
                Err(e) => {
                    warn!(event = "resolve_failed", op = %op, error = %e, "Resolution failed");
                    SessionEvent::Failed(e.to_string())
                }
            },
            Err(e) => SessionEvent::Failed(format!("cannot start worker runtime: {e}")),
        };
        let _ = tx.send(outcome);
    });
    rx
}

// ── Default backend ──────────────────────────────────────────────────────────

/// The connector the application uses for real sessions.
#[cfg(feature = "telegram")]
pub fn default_connector() -> Arc<dyn RemoteConnector> {
    use crate::core::config::SESSION_FILE;
    Arc::new(crate::remote::telegram::TelegramConnector::new(
        crate::utils::data_dir::get().join(SESSION_FILE),
    ))
}

/// Without the `telegram` feature there is no messaging backend; connecting
/// reports a configuration-style error instead of starting.
#[cfg(not(feature = "telegram"))]
pub fn default_connector() -> Arc<dyn RemoteConnector> {
    Arc::new(DisabledConnector)
}

#[cfg(not(feature = "telegram"))]
struct DisabledConnector;

#[cfg(not(feature = "telegram"))]
#[async_trait::async_trait]
impl RemoteConnector for DisabledConnector {
    async fn connect(
        &self,
        _credentials: &Credentials,
    ) -> Result<Connection, crate::remote::RemoteError> {
        Err(crate::remote::RemoteError::Unavailable(
            "this build has no messaging backend; rebuild with `--features telegram`".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{MemoryConnector, MemoryRemote, SELF_CHAT_ID};

    fn creds() -> Credentials {
        Credentials {
            api_id: 12345,
            api_hash: "0123456789abcdef".into(),
        }
    }

    #[test]
    fn credentials_parse_rejects_missing_and_invalid() {
        assert_eq!(
            Credentials::parse(None, Some("h".into())).unwrap_err(),
            ConfigError::MissingApiId
        );
        assert_eq!(
            Credentials::parse(Some("abc".into()), Some("h".into())).unwrap_err(),
            ConfigError::InvalidApiId
        );
        assert_eq!(
            Credentials::parse(Some("1".into()), Some("  ".into())).unwrap_err(),
            ConfigError::MissingApiHash
        );
        let ok = Credentials::parse(Some(" 42 ".into()), Some("hash".into())).unwrap();
        assert_eq!(ok.api_id, 42);
    }

    #[test]
    fn connect_delivers_single_connected_event() {
        let connector = Arc::new(MemoryConnector::new(Arc::new(MemoryRemote::new())));
        let rx = spawn_connect(connector, creds());

        assert!(matches!(rx.recv().unwrap(), SessionEvent::Connected(_)));
        // Terminal event is the only one.
        assert!(rx.recv().is_err());
    }

    #[test]
    fn interactive_authorization_round_trip() {
        let vault = Arc::new(MemoryRemote::new());
        let connector = Arc::new(MemoryConnector::with_code(vault, "31337"));

        let rx = spawn_connect(connector, creds());
        let pending = match rx.recv().unwrap() {
            SessionEvent::AuthorizationCodeRequired(p) => p,
            _ => panic!("expected code request"),
        };

        let rx = spawn_submit_code(pending, "31337".into());
        assert!(matches!(rx.recv().unwrap(), SessionEvent::Connected(_)));
    }

    #[test]
    fn wrong_code_fails() {
        let vault = Arc::new(MemoryRemote::new());
        let connector = Arc::new(MemoryConnector::with_code(vault, "31337"));

        let rx = spawn_connect(connector, creds());
        let pending = match rx.recv().unwrap() {
            SessionEvent::AuthorizationCodeRequired(p) => p,
            _ => panic!("expected code request"),
        };

        let rx = spawn_submit_code(pending, "00000".into());
        assert!(matches!(rx.recv().unwrap(), SessionEvent::Failed(_)));
    }

    #[test]
    fn resolve_self_alias() {
        let remote: Arc<dyn RemoteStorage> = Arc::new(MemoryRemote::new());
        let rx = spawn_resolve(remote, "me".into());
        match rx.recv().unwrap() {
            SessionEvent::DestinationResolved(dest) => assert_eq!(dest.id, SELF_CHAT_ID),
            _ => panic!("expected resolved destination"),
        }
    }

    #[test]
    fn resolve_unknown_fails() {
        let remote: Arc<dyn RemoteStorage> = Arc::new(MemoryRemote::new());
        let rx = spawn_resolve(remote, "@not-a-chat".into());
        assert!(matches!(rx.recv().unwrap(), SessionEvent::Failed(_)));
    }
}
