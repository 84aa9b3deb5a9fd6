//! Application state and controller.
//!
//! Owns the metadata store, the connected session, and the in-flight
//! operation guard. All mutation happens on the foreground thread: worker
//! channels are drained by [`App::poll_events`] on every UI tick, and the
//! store is only touched in response to a worker's terminal success event.
//! At most one connect/resolve/upload/download operation runs at a time —
//! enforced by refusing to start a second one, not by queueing.

use crate::core::config::METADATA_FILE;
use crate::core::session::{self, Credentials, SessionEvent};
use crate::core::store::{FileRecord, FileStore};
use crate::core::transfer::{self, TransferEvent};
use crate::remote::{Destination, PendingAuthorization, RemoteConnector, RemoteStorage};
use crate::ui::notify::NotifyManager;
use crate::ui::popups::{ConfirmPopup, InputPopup, Popup};
use crate::utils::data_dir;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{error, info, warn};

// ── Modes ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Mode {
    Connect,
    Files,
    Logs,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Connect => "Connect",
            Mode::Files => "Files",
            Mode::Logs => "Logs",
        }
    }
}

// ── In-flight guard ──────────────────────────────────────────────────────────

/// The single operation currently in flight, shown in the status bar.
#[derive(Clone, Debug, PartialEq)]
pub enum Busy {
    Connecting,
    Authorizing,
    Resolving,
    Uploading(String),
    Downloading(String),
}

impl Busy {
    pub fn label(&self) -> String {
        match self {
            Busy::Connecting => "Connecting...".into(),
            Busy::Authorizing => "Checking authorization code...".into(),
            Busy::Resolving => "Resolving storage chat...".into(),
            Busy::Uploading(name) => format!("Uploading {name}..."),
            Busy::Downloading(name) => format!("Downloading {name}..."),
        }
    }
}

// ── App ──────────────────────────────────────────────────────────────────────

pub struct App {
    pub mode: Mode,
    pub store: FileStore,
    pub notify: NotifyManager,

    // Session state (explicit handles, injected into every worker).
    connector: Arc<dyn RemoteConnector>,
    pub session: Option<Arc<dyn RemoteStorage>>,
    pub pending_auth: Option<Box<dyn PendingAuthorization>>,
    pub destination: Option<Destination>,

    // In-flight operation.
    pub busy: Option<Busy>,
    pub progress: Option<u8>,
    session_events: Option<Receiver<SessionEvent>>,
    transfer_events: Option<Receiver<TransferEvent>>,

    // Connect panel state.
    pub destination_input: String,
    pub editing_destination: bool,

    // Files panel state. Folders are session-local and never persisted:
    // the index format on disk stays a flat array.
    pub folders: Vec<String>,
    pub selected_folder: usize,
    pub selected_file: usize,
    pub folder_pane_focused: bool,

    // Logs panel state.
    pub log_scroll: usize,

    pub popup: Option<Popup>,
    pub should_quit: bool,
}

impl App {
    pub fn new(store: FileStore, connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            mode: Mode::Connect,
            store,
            notify: NotifyManager::new(),
            connector,
            session: None,
            pending_auth: None,
            destination: None,
            busy: None,
            progress: None,
            session_events: None,
            transfer_events: None,
            destination_input: String::new(),
            editing_destination: false,
            folders: Vec::new(),
            selected_folder: 0,
            selected_file: 0,
            folder_pane_focused: false,
            log_scroll: 0,
            popup: None,
            should_quit: false,
        }
    }

    /// Load the store from the data directory and use the default backend.
    pub fn from_data_dir() -> Self {
        let store = FileStore::load(data_dir::get().join(METADATA_FILE));
        Self::new(store, session::default_connector())
    }

    pub fn connected(&self) -> bool {
        self.session.is_some()
    }

    /// The record the file list cursor is on.
    pub fn selected_record(&self) -> Option<&FileRecord> {
        self.store.records().get(self.selected_file)
    }

    fn clamp_selection(&mut self) {
        let len = self.store.len();
        if self.selected_file >= len {
            self.selected_file = len.saturating_sub(1);
        }
    }

    /// Refuse to start anything while another operation is in flight.
    fn guard_idle(&mut self) -> bool {
        match &self.busy {
            Some(busy) => {
                self.notify
                    .warn(format!("Busy: {}", busy.label().trim_end_matches("...")));
                false
            }
            None => true,
        }
    }

    // ── Starting operations ──────────────────────────────────────────────

    pub fn start_connect(&mut self) {
        if !self.guard_idle() {
            return;
        }
        if self.connected() {
            self.notify.info("Already connected");
            return;
        }
        let credentials = match Credentials::from_env() {
            Ok(c) => c,
            Err(e) => {
                self.notify.error(e.to_string());
                return;
            }
        };
        self.busy = Some(Busy::Connecting);
        self.session_events = Some(session::spawn_connect(self.connector.clone(), credentials));
    }

    pub fn submit_auth_code(&mut self, code: String) {
        if !self.guard_idle() {
            return;
        }
        let Some(pending) = self.pending_auth.take() else {
            self.notify.error("No authorization in progress");
            return;
        };
        self.busy = Some(Busy::Authorizing);
        self.session_events = Some(session::spawn_submit_code(pending, code));
    }

    pub fn start_resolve(&mut self) {
        if !self.guard_idle() {
            return;
        }
        let Some(session) = self.session.clone() else {
            self.notify.warn("Connect first");
            return;
        };
        let query = self.destination_input.trim().to_string();
        if query.is_empty() {
            self.notify.warn("Enter a chat ID, username, or \"me\"");
            return;
        }
        self.busy = Some(Busy::Resolving);
        self.session_events = Some(session::spawn_resolve(session, query));
    }

    pub fn start_upload(&mut self, path: PathBuf) {
        if !self.guard_idle() {
            return;
        }
        let (Some(session), Some(dest)) = (self.session.clone(), self.destination.clone()) else {
            self.notify.warn("Connect and set a storage chat first");
            return;
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.busy = Some(Busy::Uploading(name));
        self.progress = Some(0);
        self.transfer_events = Some(transfer::spawn_upload(session, dest, path));
    }

    pub fn start_download(&mut self, save_path: PathBuf) {
        if !self.guard_idle() {
            return;
        }
        let (Some(session), Some(dest)) = (self.session.clone(), self.destination.clone()) else {
            self.notify.warn("Connect and set a storage chat first");
            return;
        };
        let Some((message_id, name)) = self
            .selected_record()
            .map(|r| (r.message_id, r.file_name.clone()))
        else {
            self.notify.warn("No file selected");
            return;
        };
        self.busy = Some(Busy::Downloading(name));
        self.progress = Some(0);
        self.transfer_events = Some(transfer::spawn_download(
            session, dest, message_id, save_path,
        ));
    }

    // ── Local actions ────────────────────────────────────────────────────

    /// Remove the selected record from the local index. The remote message
    /// is left untouched.
    pub fn delete_selected(&mut self) {
        let Some(name) = self.selected_record().map(|r| r.file_name.clone()) else {
            self.notify.warn("No file selected");
            return;
        };
        if self.store.remove(&name) {
            self.persist_store();
            self.clamp_selection();
            info!(event = "record_deleted", file_name = %name, "Removed local index entry");
            self.notify.success(format!("Removed {name} from the index"));
        }
    }

    /// Add a session-local virtual folder.
    pub fn create_folder(&mut self, name: String) {
        let name = name.trim().to_string();
        if name.is_empty() {
            self.notify.warn("Folder name cannot be empty");
            return;
        }
        if self.folders.iter().any(|f| f == &name) {
            self.notify.warn(format!("Folder {name} already exists"));
            return;
        }
        self.folders.push(name);
    }

    /// Flush the store, logging and swallowing failures: the in-memory
    /// state stays authoritative for the rest of the session.
    pub fn persist_store(&mut self) {
        if let Err(e) = self.store.persist() {
            error!(event = "persist_failure", error = %e, "Cannot write metadata index; keeping in-memory state");
        }
    }

    // ── Event pump ───────────────────────────────────────────────────────

    /// Drain worker channels. Called on every UI tick from the foreground
    /// thread — the only place the store is mutated.
    pub fn poll_events(&mut self) {
        if let Some(rx) = self.session_events.take() {
            loop {
                match rx.try_recv() {
                    Ok(event) => self.on_session_event(event),
                    Err(TryRecvError::Empty) => {
                        self.session_events = Some(rx);
                        break;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        if let Some(rx) = self.transfer_events.take() {
            loop {
                match rx.try_recv() {
                    Ok(event) => self.on_transfer_event(event),
                    Err(TryRecvError::Empty) => {
                        self.transfer_events = Some(rx);
                        break;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            }
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected(remote) => {
                self.session = Some(remote);
                self.busy = None;
                self.notify.success("Connected to the remote service");
            }
            SessionEvent::AuthorizationCodeRequired(pending) => {
                self.pending_auth = Some(pending);
                self.busy = None;
                self.popup = Some(Popup::Input(InputPopup::auth_code()));
                self.notify
                    .info("Authorization code required — check your account");
            }
            SessionEvent::DestinationResolved(dest) => {
                self.busy = None;
                self.notify
                    .success(format!("Storage chat set to {}", dest.title));
                self.destination = Some(dest);
                self.mode = Mode::Files;
            }
            SessionEvent::Failed(message) => {
                self.busy = None;
                self.notify.error(message);
            }
        }
    }

    fn on_transfer_event(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Progress(pct) => {
                self.progress = Some(pct);
            }
            TransferEvent::UploadComplete(record) => {
                let name = record.file_name.clone();
                self.store.append(record);
                self.persist_store();
                self.busy = None;
                self.progress = None;
                self.notify.success(format!("Uploaded {name}"));
            }
            TransferEvent::DownloadComplete(path) => {
                self.busy = None;
                self.progress = None;
                self.notify
                    .success(format!("Downloaded to {}", path.display()));
            }
            TransferEvent::Failed(failure) => {
                warn!(event = "operation_failed", kind = ?failure.kind, error = %failure, "Worker reported failure");
                self.busy = None;
                self.progress = None;
                self.notify.error(failure.message);
            }
        }
    }

    /// Open the delete confirmation for the selected record.
    pub fn request_delete(&mut self) {
        let Some(name) = self.selected_record().map(|r| r.file_name.clone()) else {
            self.notify.warn("No file selected");
            return;
        };
        self.popup = Some(Popup::Confirm(ConfirmPopup::delete(&name)));
    }
}
