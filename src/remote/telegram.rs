//! MTProto adapter over grammers (`--features telegram`).
//!
//! The SDK's connection machinery runs on one dedicated session thread with
//! its own single-thread runtime; everything else talks to it through a
//! command channel and oneshot replies. Worker threads therefore await plain
//! channel responses and never share an execution context with the client's
//! internals.
//!
//! Interactive authorization follows the service's login flow: when the
//! stored session file is not yet authorized, a login code is requested for
//! the phone number in `API_PHONE` and the user-entered code is submitted
//! through [`PendingAuthorization`].

use super::{
    Connection, Destination, PendingAuthorization, ProgressFn, RemoteConnector, RemoteError,
    RemoteMedia, RemoteMessage, RemoteStorage,
};
use crate::core::session::Credentials;
use async_trait::async_trait;
use grammers_client::types::{Downloadable, LoginToken, Media};
use grammers_client::{Client, Config, InitParams, InputMessage, SignInError};
use grammers_session::{PackedChat, Session};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

fn transport(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

fn thread_gone() -> RemoteError {
    RemoteError::Transport("session thread is gone".into())
}

fn pack_token(packed: &PackedChat) -> String {
    hex::encode(packed.to_bytes())
}

fn unpack_token(token: &str) -> Result<PackedChat, RemoteError> {
    let bytes = hex::decode(token)
        .map_err(|_| RemoteError::Transport("malformed destination token".into()))?;
    PackedChat::from_bytes(&bytes)
        .map_err(|_| RemoteError::Transport("malformed destination token".into()))
}

// ── Commands ─────────────────────────────────────────────────────────────────

enum Cmd {
    SignIn {
        code: String,
        reply: oneshot::Sender<Result<(), RemoteError>>,
    },
    Resolve {
        query: String,
        reply: oneshot::Sender<Result<Destination, RemoteError>>,
    },
    SendFile {
        dest: Destination,
        path: PathBuf,
        caption: String,
        progress: ProgressFn,
        reply: oneshot::Sender<Result<i64, RemoteError>>,
    },
    Fetch {
        dest: Destination,
        message_id: i64,
        reply: oneshot::Sender<Result<RemoteMessage, RemoteError>>,
    },
    Download {
        media: RemoteMedia,
        target: PathBuf,
        progress: ProgressFn,
        reply: oneshot::Sender<Result<PathBuf, RemoteError>>,
    },
}

// ── Connector ────────────────────────────────────────────────────────────────

pub struct TelegramConnector {
    session_file: PathBuf,
}

impl TelegramConnector {
    pub fn new(session_file: PathBuf) -> Self {
        Self { session_file }
    }
}

#[async_trait]
impl RemoteConnector for TelegramConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Connection, RemoteError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let session_file = self.session_file.clone();
        let credentials = credentials.clone();

        std::thread::spawn(move || session_thread(session_file, credentials, cmd_rx, ready_tx));

        match ready_rx.await {
            Ok(Ok(authorized)) => {
                let remote = Arc::new(TelegramRemote { cmds: cmd_tx });
                if authorized {
                    Ok(Connection::Ready(remote))
                } else {
                    Ok(Connection::CodeRequired(Box::new(TelegramPending { remote })))
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(thread_gone()),
        }
    }
}

// ── Client handle ────────────────────────────────────────────────────────────

/// Cheap handle over the session thread's command channel.
pub struct TelegramRemote {
    cmds: mpsc::UnboundedSender<Cmd>,
}

impl TelegramRemote {
    async fn roundtrip<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, RemoteError>>) -> Cmd,
    ) -> Result<T, RemoteError> {
        let (tx, rx) = oneshot::channel();
        self.cmds.send(make(tx)).map_err(|_| thread_gone())?;
        rx.await.map_err(|_| thread_gone())?
    }
}

#[async_trait]
impl RemoteStorage for TelegramRemote {
    async fn resolve_destination(&self, query: &str) -> Result<Destination, RemoteError> {
        let query = query.to_string();
        self.roundtrip(|reply| Cmd::Resolve { query, reply }).await
    }

    async fn send_file(
        &self,
        dest: &Destination,
        path: &Path,
        caption: &str,
        progress: ProgressFn,
    ) -> Result<i64, RemoteError> {
        let dest = dest.clone();
        let path = path.to_path_buf();
        let caption = caption.to_string();
        self.roundtrip(|reply| Cmd::SendFile {
            dest,
            path,
            caption,
            progress,
            reply,
        })
        .await
    }

    async fn fetch_message(
        &self,
        dest: &Destination,
        message_id: i64,
    ) -> Result<RemoteMessage, RemoteError> {
        let dest = dest.clone();
        self.roundtrip(|reply| Cmd::Fetch {
            dest,
            message_id,
            reply,
        })
        .await
    }

    async fn download_media(
        &self,
        media: &RemoteMedia,
        target: &Path,
        progress: ProgressFn,
    ) -> Result<PathBuf, RemoteError> {
        let media = media.clone();
        let target = target.to_path_buf();
        self.roundtrip(|reply| Cmd::Download {
            media,
            target,
            progress,
            reply,
        })
        .await
    }
}

struct TelegramPending {
    remote: Arc<TelegramRemote>,
}

#[async_trait]
impl PendingAuthorization for TelegramPending {
    async fn submit_code(
        self: Box<Self>,
        code: &str,
    ) -> Result<Arc<dyn RemoteStorage>, RemoteError> {
        let code = code.trim().to_string();
        self.remote
            .roundtrip(|reply| Cmd::SignIn { code, reply })
            .await?;
        Ok(self.remote as Arc<dyn RemoteStorage>)
    }
}

// ── Session thread ───────────────────────────────────────────────────────────

fn session_thread(
    session_file: PathBuf,
    credentials: Credentials,
    mut cmds: mpsc::UnboundedReceiver<Cmd>,
    ready: oneshot::Sender<Result<bool, RemoteError>>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready.send(Err(transport(e)));
            return;
        }
    };

    rt.block_on(async move {
        let session = match Session::load_file_or_create(&session_file) {
            Ok(s) => s,
            Err(e) => {
                let _ = ready.send(Err(transport(format!("cannot load session file: {e}"))));
                return;
            }
        };

        let client = match Client::connect(Config {
            session,
            api_id: credentials.api_id,
            api_hash: credentials.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        {
            Ok(c) => c,
            Err(e) => {
                let _ = ready.send(Err(transport(e)));
                return;
            }
        };

        let authorized = match client.is_authorized().await {
            Ok(a) => a,
            Err(e) => {
                let _ = ready.send(Err(transport(e)));
                return;
            }
        };

        let mut login_token: Option<LoginToken> = None;
        if !authorized {
            // Requesting the login code needs the account's phone number,
            // which is not part of the api-id/api-hash pair.
            let phone = match std::env::var("API_PHONE") {
                Ok(p) if !p.trim().is_empty() => p,
                _ => {
                    let _ = ready.send(Err(RemoteError::Unavailable(
                        "session is not authorized and API_PHONE is not set".into(),
                    )));
                    return;
                }
            };
            match client.request_login_code(phone.trim()).await {
                Ok(token) => login_token = Some(token),
                Err(e) => {
                    let _ = ready.send(Err(transport(e)));
                    return;
                }
            }
        }

        info!(event = "session_thread_ready", authorized, "Remote session established");
        let _ = ready.send(Ok(authorized));

        let mut actor = SessionActor {
            client,
            session_file,
            media_cache: HashMap::new(),
            media_seq: 0,
        };
        while let Some(cmd) = cmds.recv().await {
            actor.handle(cmd, &mut login_token).await;
        }
        info!(event = "session_thread_stopped", "Remote session closed");
    });
}

struct SessionActor {
    client: Client,
    session_file: PathBuf,
    /// Fetched media handles, referenced by download commands.
    media_cache: HashMap<String, Media>,
    media_seq: u64,
}

impl SessionActor {
    async fn handle(&mut self, cmd: Cmd, login_token: &mut Option<LoginToken>) {
        match cmd {
            Cmd::SignIn { code, reply } => {
                let _ = reply.send(self.sign_in(login_token, &code).await);
            }
            Cmd::Resolve { query, reply } => {
                let _ = reply.send(self.resolve(&query).await);
            }
            Cmd::SendFile {
                dest,
                path,
                caption,
                progress,
                reply,
            } => {
                let _ = reply.send(self.send_file(&dest, &path, &caption, progress).await);
            }
            Cmd::Fetch {
                dest,
                message_id,
                reply,
            } => {
                let _ = reply.send(self.fetch(&dest, message_id).await);
            }
            Cmd::Download {
                media,
                target,
                progress,
                reply,
            } => {
                let _ = reply.send(self.download(&media, &target, progress).await);
            }
        }
    }

    async fn sign_in(
        &mut self,
        login_token: &mut Option<LoginToken>,
        code: &str,
    ) -> Result<(), RemoteError> {
        let token = login_token
            .take()
            .ok_or_else(|| RemoteError::Transport("no pending authorization".into()))?;
        match self.client.sign_in(&token, code).await {
            Ok(_) => {
                if let Err(e) = self.client.session().save_to_file(&self.session_file) {
                    error!(event = "session_save_failure", error = %e, "Cannot persist session file");
                }
                Ok(())
            }
            Err(SignInError::InvalidCode) => {
                warn!(event = "sign_in_invalid_code", "Invalid authorization code");
                Err(RemoteError::NotAuthorized)
            }
            Err(SignInError::PasswordRequired(_)) => Err(RemoteError::Unavailable(
                "account uses a 2FA password, which this client does not support".into(),
            )),
            Err(e) => Err(RemoteError::Transport(format!("{e:?}"))),
        }
    }

    async fn resolve(&mut self, query: &str) -> Result<Destination, RemoteError> {
        let query = query.trim();

        if query.eq_ignore_ascii_case("me") {
            let me = self.client.get_me().await.map_err(transport)?;
            let packed = me.pack();
            return Ok(Destination {
                id: packed.id,
                title: me.full_name(),
                token: pack_token(&packed),
            });
        }

        if let Ok(id) = query.parse::<i64>() {
            // Bare numeric IDs carry no access hash; map them through the
            // dialog list like the official clients do.
            let mut dialogs = self.client.iter_dialogs();
            while let Some(dialog) = dialogs.next().await.map_err(transport)? {
                let chat = dialog.chat();
                if chat.id() == id {
                    return Ok(Destination {
                        id,
                        title: chat.name().to_string(),
                        token: pack_token(&chat.pack()),
                    });
                }
            }
            return Err(RemoteError::UnknownDestination(query.to_string()));
        }

        let bare = query.strip_prefix('@').unwrap_or(query);
        match self.client.resolve_username(bare).await.map_err(transport)? {
            Some(chat) => Ok(Destination {
                id: chat.id(),
                title: chat.name().to_string(),
                token: pack_token(&chat.pack()),
            }),
            None => Err(RemoteError::UnknownDestination(query.to_string())),
        }
    }

    async fn send_file(
        &mut self,
        dest: &Destination,
        path: &Path,
        caption: &str,
        progress: ProgressFn,
    ) -> Result<i64, RemoteError> {
        let packed = unpack_token(&dest.token)?;

        let file = tokio::fs::File::open(path).await.map_err(transport)?;
        let size = file.metadata().await.map_err(transport)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file.bin".into());

        let mut reader = ProgressRead {
            inner: file,
            done: 0,
            total: size,
            progress,
        };
        let uploaded = self
            .client
            .upload_stream(&mut reader, size as usize, name)
            .await
            .map_err(transport)?;

        let message = self
            .client
            .send_message(packed, InputMessage::text(caption).document(uploaded))
            .await
            .map_err(transport)?;
        Ok(message.id() as i64)
    }

    async fn fetch(
        &mut self,
        dest: &Destination,
        message_id: i64,
    ) -> Result<RemoteMessage, RemoteError> {
        let packed = unpack_token(&dest.token)?;
        let messages = self
            .client
            .get_messages_by_id(packed, &[message_id as i32])
            .await
            .map_err(transport)?;
        let message = messages
            .into_iter()
            .flatten()
            .next()
            .ok_or(RemoteError::MessageNotFound(message_id))?;

        let media = message.media().map(|media| {
            let size = match &media {
                Media::Document(doc) => doc.size().max(0) as u64,
                _ => 0,
            };
            self.media_seq += 1;
            let token = format!("media-{}", self.media_seq);
            self.media_cache.insert(token.clone(), media);
            RemoteMedia { size, token }
        });

        Ok(RemoteMessage {
            id: message.id() as i64,
            media,
        })
    }

    async fn download(
        &mut self,
        media_ref: &RemoteMedia,
        target: &Path,
        mut progress: ProgressFn,
    ) -> Result<PathBuf, RemoteError> {
        let media = self
            .media_cache
            .get(&media_ref.token)
            .cloned()
            .ok_or_else(|| {
                RemoteError::Transport("stale media reference; fetch the message again".into())
            })?;

        let mut download = self.client.iter_download(&Downloadable::Media(media));
        let mut file = tokio::fs::File::create(target).await.map_err(transport)?;
        let mut done: u64 = 0;
        while let Some(chunk) = download.next().await.map_err(transport)? {
            file.write_all(&chunk).await.map_err(transport)?;
            done += chunk.len() as u64;
            progress(done, media_ref.size);
        }
        file.flush().await.map_err(transport)?;

        Ok(target.to_path_buf())
    }
}

// ── Progress-counting reader ─────────────────────────────────────────────────

/// Wraps the upload stream and reports bytes as the SDK consumes them.
struct ProgressRead<R> {
    inner: R,
    done: u64,
    total: u64,
    progress: ProgressFn,
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressRead<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let me = &mut *self;
        match Pin::new(&mut me.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len() - before;
                if n > 0 {
                    me.done += n as u64;
                    (me.progress)(me.done, me.total);
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
