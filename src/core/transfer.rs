//! One-shot upload and download operations.
//!
//! Each operation runs on its own worker thread owning a private
//! single-thread runtime, so a long transfer never blocks the interface
//! and workers never share an execution context. Events flow back over a
//! channel: zero or more `Progress` percentages (non-decreasing, duplicates
//! coalesced), strictly followed by exactly one terminal event — success or
//! failure — after which the channel closes. A started operation is never
//! cancelled; it runs to its terminal event.

use crate::core::error::{FailureKind, OperationFailure};
use crate::core::store::FileRecord;
use crate::remote::{Destination, ProgressFn, RemoteError, RemoteStorage};
use crate::utils::sha256::sha256_file;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ── Events ───────────────────────────────────────────────────────────────────

/// Event stream of a transfer operation.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// Integer percentage, `floor(bytes_done * 100 / bytes_total)`.
    Progress(u8),
    /// Terminal: the upload succeeded and produced this record.
    UploadComplete(FileRecord),
    /// Terminal: the download succeeded at this local path.
    DownloadComplete(PathBuf),
    /// Terminal: the operation failed.
    Failed(OperationFailure),
}

/// Caption attached to the uploaded message, for human and remote-side
/// inspection only — it is never re-parsed locally.
#[derive(Serialize)]
struct UploadCaption<'a> {
    file_name: &'a str,
    original_path: &'a str,
    upload_date: &'a str,
    file_size: u64,
    file_hash: &'a str,
}

// ── Plumbing ─────────────────────────────────────────────────────────────────

fn worker_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Progress callback translating byte counts into coalesced, non-decreasing
/// percentage events.
fn progress_reporter(tx: Sender<TransferEvent>) -> ProgressFn {
    let mut last: Option<u8> = None;
    Box::new(move |done, total| {
        if total == 0 {
            return;
        }
        let pct = ((done as u128 * 100) / total as u128).min(100) as u8;
        if last.is_none_or(|l| pct > l) {
            last = Some(pct);
            let _ = tx.send(TransferEvent::Progress(pct));
        }
    })
}

fn remote_failure(e: RemoteError) -> OperationFailure {
    let kind = if e.is_not_found() {
        FailureKind::NotFound
    } else if matches!(e, RemoteError::NotAuthorized) {
        FailureKind::Unauthorized
    } else {
        FailureKind::Transport
    };
    OperationFailure::new(kind, e.to_string())
}

// ── Upload ───────────────────────────────────────────────────────────────────

/// Upload `path` to `dest`. Returns the channel delivering progress and the
/// single terminal event.
pub fn spawn_upload(
    remote: Arc<dyn RemoteStorage>,
    dest: Destination,
    path: PathBuf,
) -> Receiver<TransferEvent> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let op = Uuid::new_v4();
        info!(event = "upload_started", op = %op, path = %path.display(), dest = dest.id, "Upload started");
        let terminal = match worker_runtime() {
            Ok(rt) => match rt.block_on(run_upload(remote, &dest, &path, &tx)) {
                Ok(record) => {
                    info!(event = "upload_ok", op = %op, message_id = record.message_id, size = record.file_size, "Upload complete");
                    TransferEvent::UploadComplete(record)
                }
                Err(failure) => {
                    warn!(event = "upload_failed", op = %op, kind = ?failure.kind, error = %failure, "Upload failed");
                    TransferEvent::Failed(failure)
                }
            },
            Err(e) => TransferEvent::Failed(OperationFailure::io(&e, "cannot start worker runtime")),
        };
        let _ = tx.send(terminal);
    });
    rx
}

async fn run_upload(
    remote: Arc<dyn RemoteStorage>,
    dest: &Destination,
    path: &Path,
    tx: &Sender<TransferEvent>,
) -> Result<FileRecord, OperationFailure> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            OperationFailure::new(
                FailureKind::Io,
                format!("not a file path: {}", path.display()),
            )
        })?;

    let metadata = std::fs::metadata(path)
        .map_err(|e| OperationFailure::io(&e, &format!("cannot read {}", path.display())))?;
    if !metadata.is_file() {
        return Err(OperationFailure::new(
            FailureKind::Io,
            format!("{} is not a regular file", path.display()),
        ));
    }
    let file_size = metadata.len();

    // Hash before transfer so the caption and the record agree even if the
    // file changes later.
    let file_hash =
        sha256_file(path).map_err(|e| OperationFailure::io(&e, "cannot hash file content"))?;
    let upload_date = chrono::Utc::now().to_rfc3339();

    let caption = serde_json::to_string(&UploadCaption {
        file_name: &file_name,
        original_path: &path.display().to_string(),
        upload_date: &upload_date,
        file_size,
        file_hash: &file_hash,
    })
    .map_err(|e| OperationFailure::new(FailureKind::Io, format!("cannot encode caption: {e}")))?;

    let message_id = remote
        .send_file(dest, path, &caption, progress_reporter(tx.clone()))
        .await
        .map_err(remote_failure)?;

    Ok(FileRecord {
        file_name,
        message_id,
        file_size,
        upload_date,
        file_hash,
    })
}

// ── Download ─────────────────────────────────────────────────────────────────

/// Download the media of message `message_id` in `dest` to `target`.
pub fn spawn_download(
    remote: Arc<dyn RemoteStorage>,
    dest: Destination,
    message_id: i64,
    target: PathBuf,
) -> Receiver<TransferEvent> {
    let (tx, rx) = channel();
    std::thread::spawn(move || {
        let op = Uuid::new_v4();
        info!(event = "download_started", op = %op, message_id, target = %target.display(), "Download started");
        let terminal = match worker_runtime() {
            Ok(rt) => match rt.block_on(run_download(remote, &dest, message_id, &target, &tx)) {
                Ok(path) => {
                    info!(event = "download_ok", op = %op, path = %path.display(), "Download complete");
                    TransferEvent::DownloadComplete(path)
                }
                Err(failure) => {
                    warn!(event = "download_failed", op = %op, kind = ?failure.kind, error = %failure, "Download failed");
                    remove_partial(&target);
                    TransferEvent::Failed(failure)
                }
            },
            Err(e) => TransferEvent::Failed(OperationFailure::io(&e, "cannot start worker runtime")),
        };
        let _ = tx.send(terminal);
    });
    rx
}

async fn run_download(
    remote: Arc<dyn RemoteStorage>,
    dest: &Destination,
    message_id: i64,
    target: &Path,
    tx: &Sender<TransferEvent>,
) -> Result<PathBuf, OperationFailure> {
    let message = remote
        .fetch_message(dest, message_id)
        .await
        .map_err(remote_failure)?;
    debug!(event = "message_fetched", message_id = message.id, has_media = message.media.is_some());
    let media = message
        .media
        .ok_or_else(|| remote_failure(RemoteError::NoMedia(message_id)))?;

    remote
        .download_media(&media, target, progress_reporter(tx.clone()))
        .await
        .map_err(remote_failure)
}

/// A failed download leaves no partial output behind.
fn remove_partial(target: &Path) {
    match std::fs::remove_file(target) {
        Ok(()) => info!(event = "partial_download_removed", path = %target.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(event = "partial_download_cleanup_failed", path = %target.display(), error = %e, "Cannot remove partial download"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemoryRemote;
    use crate::remote::{RemoteMedia, RemoteMessage};
    use crate::utils::sha256::sha256_bytes;
    use async_trait::async_trait;

    /// Receive every event until the worker drops its sender.
    fn drain(rx: Receiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv() {
            events.push(event);
        }
        events
    }

    fn is_terminal(event: &TransferEvent) -> bool {
        !matches!(event, TransferEvent::Progress(_))
    }

    /// Event-stream law: non-decreasing bounded progress, then exactly one
    /// terminal event, then nothing.
    fn assert_event_stream_law(events: &[TransferEvent]) {
        assert!(!events.is_empty());
        let (terminal, progress) = events.split_last().unwrap();
        assert!(is_terminal(terminal), "last event must be terminal");
        let mut last = 0u8;
        for event in progress {
            match event {
                TransferEvent::Progress(pct) => {
                    assert!(*pct <= 100);
                    assert!(*pct >= last, "progress must be non-decreasing");
                    last = *pct;
                }
                other => panic!("terminal event before the end: {other:?}"),
            }
        }
    }

    fn resolved_me(remote: &Arc<MemoryRemote>) -> Destination {
        worker_runtime()
            .unwrap()
            .block_on(remote.resolve_destination("me"))
            .unwrap()
    }

    fn sample_file(dir: &Path, name: &str, len: usize) -> (PathBuf, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
        let path = dir.join(name);
        std::fs::write(&path, &data).unwrap();
        (path, data)
    }

    #[test]
    fn upload_produces_matching_record_and_lawful_events() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);
        let (path, data) = sample_file(dir.path(), "report.pdf", 2_048_000);

        let events = drain(spawn_upload(remote.clone(), dest.clone(), path));
        assert_event_stream_law(&events);

        let record = match events.last().unwrap() {
            TransferEvent::UploadComplete(record) => record.clone(),
            other => panic!("expected UploadComplete, got {other:?}"),
        };
        assert_eq!(record.file_name, "report.pdf");
        assert_eq!(record.file_size, 2_048_000);
        assert_eq!(record.file_hash, sha256_bytes(&data));
        assert_eq!(record.file_hash.len(), 64);
        assert!(record.message_id > 0);

        // Transfers of known size reach 100%.
        assert!(
            events
                .iter()
                .any(|e| matches!(e, TransferEvent::Progress(100)))
        );

        // The remote chat holds exactly the message the record points at.
        assert_eq!(remote.message_count(dest.id), 1);

        // The caption reached the remote side.
        let caption = remote.caption(dest.id, record.message_id).unwrap();
        assert!(caption.contains("report.pdf"));
        assert!(caption.contains(&record.file_hash));
    }

    #[test]
    fn upload_then_download_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);
        let (path, data) = sample_file(dir.path(), "archive.bin", 300_000);

        let events = drain(spawn_upload(remote.clone(), dest.clone(), path));
        let record = match events.last().unwrap() {
            TransferEvent::UploadComplete(record) => record.clone(),
            other => panic!("expected UploadComplete, got {other:?}"),
        };

        let target = dir.path().join("restored.bin");
        let events = drain(spawn_download(
            remote,
            dest,
            record.message_id,
            target.clone(),
        ));
        assert_event_stream_law(&events);
        match events.last().unwrap() {
            TransferEvent::DownloadComplete(path) => assert_eq!(path, &target),
            other => panic!("expected DownloadComplete, got {other:?}"),
        }
        assert_eq!(std::fs::read(&target).unwrap(), data);
    }

    #[test]
    fn upload_of_missing_file_fails_once_with_io_kind() {
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);

        let events = drain(spawn_upload(
            remote,
            dest,
            PathBuf::from("/no/such/file.bin"),
        ));
        assert_eq!(events.len(), 1);
        match &events[0] {
            TransferEvent::Failed(failure) => assert_eq!(failure.kind, FailureKind::Io),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn download_of_unknown_message_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);

        let events = drain(spawn_download(
            remote,
            dest,
            424_242,
            dir.path().join("out.bin"),
        ));
        assert_eq!(events.len(), 1);
        match &events[0] {
            TransferEvent::Failed(failure) => assert_eq!(failure.kind, FailureKind::NotFound),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn download_of_text_message_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);
        let id = remote.push_text_message(dest.id, "no attachment here");

        let events = drain(spawn_download(remote, dest, id, dir.path().join("out.bin")));
        match events.last().unwrap() {
            TransferEvent::Failed(failure) => assert_eq!(failure.kind, FailureKind::NotFound),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    /// Backend that dies halfway through a download, leaving partial output.
    struct FlakyRemote {
        payload: Vec<u8>,
    }

    #[async_trait]
    impl RemoteStorage for FlakyRemote {
        async fn resolve_destination(&self, _query: &str) -> Result<Destination, RemoteError> {
            Ok(Destination {
                id: 1,
                title: "flaky".into(),
                token: "flaky:1".into(),
            })
        }

        async fn send_file(
            &self,
            _dest: &Destination,
            _path: &Path,
            _caption: &str,
            _progress: ProgressFn,
        ) -> Result<i64, RemoteError> {
            Err(RemoteError::Transport("flaky".into()))
        }

        async fn fetch_message(
            &self,
            _dest: &Destination,
            message_id: i64,
        ) -> Result<RemoteMessage, RemoteError> {
            Ok(RemoteMessage {
                id: message_id,
                media: Some(RemoteMedia {
                    size: self.payload.len() as u64,
                    token: "flaky-media".into(),
                }),
            })
        }

        async fn download_media(
            &self,
            media: &RemoteMedia,
            target: &Path,
            mut progress: ProgressFn,
        ) -> Result<PathBuf, RemoteError> {
            let half = &self.payload[..self.payload.len() / 2];
            std::fs::write(target, half).map_err(|e| RemoteError::Transport(e.to_string()))?;
            progress(half.len() as u64, media.size);
            Err(RemoteError::Transport("connection reset".into()))
        }
    }

    #[test]
    fn failed_download_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let remote: Arc<dyn RemoteStorage> = Arc::new(FlakyRemote {
            payload: vec![7u8; 10_000],
        });
        let dest = Destination {
            id: 1,
            title: "flaky".into(),
            token: "flaky:1".into(),
        };
        let target = dir.path().join("partial.bin");

        let events = drain(spawn_download(remote, dest, 5, target.clone()));
        assert_event_stream_law(&events);
        assert!(matches!(events.last().unwrap(), TransferEvent::Failed(_)));
        assert!(!target.exists(), "partial file must be deleted on failure");
    }

    #[test]
    fn identical_content_different_names_hash_equal_but_records_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let dest = resolved_me(&remote);

        std::fs::write(dir.path().join("one.dat"), b"same payload").unwrap();
        std::fs::write(dir.path().join("two.dat"), b"same payload").unwrap();

        let first = drain(spawn_upload(
            remote.clone(),
            dest.clone(),
            dir.path().join("one.dat"),
        ));
        let second = drain(spawn_upload(remote, dest, dir.path().join("two.dat")));

        let (a, b) = match (first.last().unwrap(), second.last().unwrap()) {
            (TransferEvent::UploadComplete(a), TransferEvent::UploadComplete(b)) => {
                (a.clone(), b.clone())
            }
            other => panic!("expected two completed uploads, got {other:?}"),
        };
        assert_eq!(a.file_hash, b.file_hash);
        assert_ne!(a.file_name, b.file_name);
        assert_ne!(a.message_id, b.message_id);
    }
}
