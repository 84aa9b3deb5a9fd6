//! In-process loopback vault implementing the remote boundary.
//!
//! Stores "messages" (caption + attachment bytes) per chat in memory and
//! honors the full collaborator contract: the `"me"` self-chat alias,
//! username and numeric-ID resolution, message-by-id lookup, byte-exact
//! media download, and chunked progress reporting. The test suite uses it
//! as the stand-in for the real messaging service.

use super::{
    Connection, Destination, PendingAuthorization, ProgressFn, RemoteConnector, RemoteError,
    RemoteMedia, RemoteMessage, RemoteStorage,
};
use crate::core::config::STREAM_CHUNK_SIZE;
use crate::core::session::Credentials;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Chat id of the built-in self chat (the `"me"` alias).
pub const SELF_CHAT_ID: i64 = 777_000;

struct StoredMessage {
    id: i64,
    caption: String,
    attachment: Option<Vec<u8>>,
}

struct MemoryChat {
    dest: Destination,
    username: Option<String>,
    messages: Vec<StoredMessage>,
}

#[derive(Default)]
struct VaultState {
    chats: Vec<MemoryChat>,
    next_message_id: i64,
}

impl VaultState {
    fn chat_mut(&mut self, dest_id: i64) -> Option<&mut MemoryChat> {
        self.chats.iter_mut().find(|c| c.dest.id == dest_id)
    }

    fn chat(&self, dest_id: i64) -> Option<&MemoryChat> {
        self.chats.iter().find(|c| c.dest.id == dest_id)
    }
}

/// In-memory remote vault.
pub struct MemoryRemote {
    state: Mutex<VaultState>,
}

impl MemoryRemote {
    /// A vault containing only the self chat.
    pub fn new() -> Self {
        let mut state = VaultState {
            chats: Vec::new(),
            next_message_id: 1,
        };
        state.chats.push(MemoryChat {
            dest: destination(SELF_CHAT_ID, "Saved Messages"),
            username: None,
            messages: Vec::new(),
        });
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add a named chat reachable by `@username` or numeric id.
    pub fn with_chat(self, username: &str, id: i64, title: &str) -> Self {
        self.state.lock().unwrap().chats.push(MemoryChat {
            dest: destination(id, title),
            username: Some(username.to_string()),
            messages: Vec::new(),
        });
        self
    }

    /// Insert a plain text message (no attachment); returns its id.
    /// Lets tests exercise the "message has no media" download failure.
    pub fn push_text_message(&self, dest_id: i64, text: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_message_id;
        state.next_message_id += 1;
        let chat = state.chat_mut(dest_id).expect("unknown chat id");
        chat.messages.push(StoredMessage {
            id,
            caption: text.to_string(),
            attachment: None,
        });
        id
    }

    /// Number of messages stored in a chat.
    pub fn message_count(&self, dest_id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .chat(dest_id)
            .map(|c| c.messages.len())
            .unwrap_or(0)
    }

    /// Caption of a stored message, if present.
    pub fn caption(&self, dest_id: i64, message_id: i64) -> Option<String> {
        self.state.lock().unwrap().chat(dest_id).and_then(|c| {
            c.messages
                .iter()
                .find(|m| m.id == message_id)
                .map(|m| m.caption.clone())
        })
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn destination(id: i64, title: &str) -> Destination {
    Destination {
        id,
        title: title.to_string(),
        token: format!("mem:{id}"),
    }
}

fn media_token(dest_id: i64, message_id: i64) -> String {
    format!("{dest_id}/{message_id}")
}

fn parse_media_token(token: &str) -> Option<(i64, i64)> {
    let (dest, msg) = token.split_once('/')?;
    Some((dest.parse().ok()?, msg.parse().ok()?))
}

#[async_trait]
impl RemoteStorage for MemoryRemote {
    async fn resolve_destination(&self, query: &str) -> Result<Destination, RemoteError> {
        let state = self.state.lock().unwrap();
        let query = query.trim();

        if query.eq_ignore_ascii_case("me") {
            return Ok(state.chat(SELF_CHAT_ID).unwrap().dest.clone());
        }

        let bare = query.strip_prefix('@').unwrap_or(query);
        if let Some(chat) = state
            .chats
            .iter()
            .find(|c| c.username.as_deref() == Some(bare))
        {
            return Ok(chat.dest.clone());
        }

        if let Ok(id) = query.parse::<i64>()
            && let Some(chat) = state.chat(id)
        {
            return Ok(chat.dest.clone());
        }

        Err(RemoteError::UnknownDestination(query.to_string()))
    }

    async fn send_file(
        &self,
        dest: &Destination,
        path: &Path,
        caption: &str,
        mut progress: ProgressFn,
    ) -> Result<i64, RemoteError> {
        // Destination handles are opaque but still ours: reject tokens that
        // did not come from this backend.
        if dest.token != format!("mem:{}", dest.id) {
            return Err(RemoteError::UnknownDestination(dest.token.clone()));
        }

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| RemoteError::Transport(format!("cannot open {}: {e}", path.display())))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?
            .len();

        let mut bytes = Vec::with_capacity(total as usize);
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        let mut done: u64 = 0;
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&buf[..n]);
            done += n as u64;
            progress(done, total);
        }

        let mut state = self.state.lock().unwrap();
        let id = state.next_message_id;
        state.next_message_id += 1;
        let chat = state
            .chat_mut(dest.id)
            .ok_or_else(|| RemoteError::UnknownDestination(dest.id.to_string()))?;
        chat.messages.push(StoredMessage {
            id,
            caption: caption.to_string(),
            attachment: Some(bytes),
        });
        Ok(id)
    }

    async fn fetch_message(
        &self,
        dest: &Destination,
        message_id: i64,
    ) -> Result<RemoteMessage, RemoteError> {
        let state = self.state.lock().unwrap();
        let chat = state
            .chat(dest.id)
            .ok_or_else(|| RemoteError::UnknownDestination(dest.id.to_string()))?;
        let message = chat
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or(RemoteError::MessageNotFound(message_id))?;

        Ok(RemoteMessage {
            id: message.id,
            media: message.attachment.as_ref().map(|bytes| RemoteMedia {
                size: bytes.len() as u64,
                token: media_token(dest.id, message.id),
            }),
        })
    }

    async fn download_media(
        &self,
        media: &RemoteMedia,
        target: &Path,
        mut progress: ProgressFn,
    ) -> Result<PathBuf, RemoteError> {
        let (dest_id, message_id) = parse_media_token(&media.token)
            .ok_or_else(|| RemoteError::Transport(format!("bad media token: {}", media.token)))?;

        let bytes = {
            let state = self.state.lock().unwrap();
            let chat = state
                .chat(dest_id)
                .ok_or_else(|| RemoteError::UnknownDestination(dest_id.to_string()))?;
            let message = chat
                .messages
                .iter()
                .find(|m| m.id == message_id)
                .ok_or(RemoteError::MessageNotFound(message_id))?;
            message
                .attachment
                .clone()
                .ok_or(RemoteError::NoMedia(message_id))?
        };

        let total = media.size;
        let mut file = tokio::fs::File::create(target)
            .await
            .map_err(|e| RemoteError::Transport(format!("cannot create {}: {e}", target.display())))?;
        let mut done: u64 = 0;
        for chunk in bytes.chunks(STREAM_CHUNK_SIZE) {
            file.write_all(chunk)
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            done += chunk.len() as u64;
            progress(done, total);
        }
        file.flush()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(target.to_path_buf())
    }
}

// ── Connector ────────────────────────────────────────────────────────────────

/// Connector over a shared [`MemoryRemote`], optionally demanding an
/// authorization code first.
pub struct MemoryConnector {
    remote: Arc<MemoryRemote>,
    required_code: Option<String>,
}

impl MemoryConnector {
    pub fn new(remote: Arc<MemoryRemote>) -> Self {
        Self {
            remote,
            required_code: None,
        }
    }

    /// Demand `code` through the interactive-authorization path.
    pub fn with_code(remote: Arc<MemoryRemote>, code: &str) -> Self {
        Self {
            remote,
            required_code: Some(code.to_string()),
        }
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(&self, _credentials: &Credentials) -> Result<Connection, RemoteError> {
        match &self.required_code {
            None => Ok(Connection::Ready(self.remote.clone())),
            Some(code) => Ok(Connection::CodeRequired(Box::new(MemoryPending {
                remote: self.remote.clone(),
                expected: code.clone(),
            }))),
        }
    }
}

struct MemoryPending {
    remote: Arc<MemoryRemote>,
    expected: String,
}

#[async_trait]
impl PendingAuthorization for MemoryPending {
    async fn submit_code(
        self: Box<Self>,
        code: &str,
    ) -> Result<Arc<dyn RemoteStorage>, RemoteError> {
        if code.trim() == self.expected {
            Ok(self.remote)
        } else {
            Err(RemoteError::NotAuthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn resolves_self_alias_and_username() {
        let vault = MemoryRemote::new().with_chat("backupchat", 42, "Backups");

        let me = block_on(vault.resolve_destination("me")).unwrap();
        assert_eq!(me.id, SELF_CHAT_ID);

        let by_name = block_on(vault.resolve_destination("@backupchat")).unwrap();
        assert_eq!(by_name.id, 42);
        let by_id = block_on(vault.resolve_destination("42")).unwrap();
        assert_eq!(by_id, by_name);
    }

    #[test]
    fn unknown_destination_is_an_error() {
        let vault = MemoryRemote::new();
        let err = block_on(vault.resolve_destination("@nobody")).unwrap_err();
        assert!(matches!(err, RemoteError::UnknownDestination(_)));
    }

    #[test]
    fn fetch_of_missing_message_is_not_found() {
        let vault = MemoryRemote::new();
        let dest = block_on(vault.resolve_destination("me")).unwrap();
        let err = block_on(vault.fetch_message(&dest, 9)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn text_message_has_no_media() {
        let vault = MemoryRemote::new();
        let dest = block_on(vault.resolve_destination("me")).unwrap();
        let id = vault.push_text_message(dest.id, "just text");
        let message = block_on(vault.fetch_message(&dest, id)).unwrap();
        assert!(message.media.is_none());
    }
}
