//! Local metadata index of uploaded files.
//!
//! A flat, ordered list of [`FileRecord`]s persisted as a single JSON
//! document (top-level array). The remote chat is the source of truth for
//! file content; this index is only the local map from file names to remote
//! message identifiers. The in-memory copy is authoritative during a
//! session and flushed after every mutation by the controller.
//!
//! Loading is fail-open: a missing file yields an empty store, and entries
//! that fail validation are quarantined to a sidecar file (and logged)
//! rather than trusted or silently dropped.

use crate::core::config::QUARANTINE_FILE;
use crate::utils::atomic_write::atomic_write;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

// ── Record ───────────────────────────────────────────────────────────────────

/// One entry per uploaded file.
///
/// `file_name` is the user-facing key. Duplicates are permitted for
/// compatibility with the on-disk format; lookups return the first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Base name of the source file.
    pub file_name: String,
    /// Remote message identifier holding the attachment.
    pub message_id: i64,
    /// Size in bytes at upload time.
    pub file_size: u64,
    /// ISO-8601 creation timestamp.
    pub upload_date: String,
    /// Hex SHA-256 of the content at upload time (reference only; not
    /// verified on download).
    pub file_hash: String,
}

impl FileRecord {
    /// Structural validation applied on load.
    fn validate(&self) -> Result<(), &'static str> {
        if self.file_name.is_empty() {
            return Err("empty file_name");
        }
        if self.message_id <= 0 {
            return Err("non-positive message_id");
        }
        if self.file_hash.len() != 64 || !self.file_hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("file_hash is not a 64-char hex digest");
        }
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// The ordered metadata index. Owned and mutated only by the foreground
/// thread; workers never touch it.
pub struct FileStore {
    path: PathBuf,
    records: Vec<FileRecord>,
}

impl FileStore {
    /// Load the index from `path`. Never fails: a missing file yields an
    /// empty store; an unparsable document or invalid entries are moved to
    /// the quarantine sidecar and logged.
    pub fn load(path: PathBuf) -> Self {
        let mut store = Self {
            path,
            records: Vec::new(),
        };

        let raw = match std::fs::read_to_string(&store.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return store,
            Err(e) => {
                error!(
                    event = "metadata_read_failure",
                    path = %store.path.display(),
                    error = %e,
                    "Cannot read metadata index, starting empty"
                );
                return store;
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    event = "metadata_parse_failure",
                    path = %store.path.display(),
                    error = %e,
                    "Metadata index is not a JSON array, quarantining the document"
                );
                store.quarantine(vec![serde_json::Value::String(raw)]);
                return store;
            }
        };

        let mut rejected = Vec::new();
        for entry in entries {
            match serde_json::from_value::<FileRecord>(entry.clone()) {
                Ok(record) => match record.validate() {
                    Ok(()) => store.records.push(record),
                    Err(reason) => {
                        warn!(event = "metadata_entry_rejected", reason, "Quarantining invalid entry");
                        rejected.push(entry);
                    }
                },
                Err(e) => {
                    warn!(event = "metadata_entry_rejected", error = %e, "Quarantining malformed entry");
                    rejected.push(entry);
                }
            }
        }
        if !rejected.is_empty() {
            store.quarantine(rejected);
        }

        info!(
            event = "metadata_loaded",
            path = %store.path.display(),
            records = store.records.len(),
            "Metadata index loaded"
        );
        store
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record. Duplicate names are allowed (on-disk format
    /// compatibility) but flagged, since lookups only ever see the first.
    pub fn append(&mut self, record: FileRecord) {
        if self.find(&record.file_name).is_some() {
            warn!(
                event = "duplicate_file_name",
                file_name = %record.file_name,
                "A record with this name already exists; lookups return the first match"
            );
        }
        self.records.push(record);
    }

    /// Remove the first record with the given name. A missing name is a
    /// no-op; returns whether a record was removed.
    pub fn remove(&mut self, file_name: &str) -> bool {
        match self.records.iter().position(|r| r.file_name == file_name) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }

    /// First record with the given name, if any.
    pub fn find(&self, file_name: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.file_name == file_name)
    }

    /// Serialize the full sequence to the backing file atomically.
    ///
    /// The controller logs and swallows failures: in-memory state stays
    /// authoritative for the rest of the session.
    pub fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.records)?;
        atomic_write(&self.path, content.as_bytes())
    }

    fn quarantine_path(&self) -> PathBuf {
        self.path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(QUARANTINE_FILE)
    }

    /// Append rejected entries to the quarantine sidecar.
    fn quarantine(&self, entries: Vec<serde_json::Value>) {
        let path = self.quarantine_path();
        let mut existing: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let count = entries.len();
        existing.extend(entries);

        match serde_json::to_string_pretty(&existing) {
            Ok(content) => {
                if let Err(e) = atomic_write(&path, content.as_bytes()) {
                    error!(event = "quarantine_write_failure", error = %e, "Cannot write quarantine sidecar");
                } else {
                    warn!(
                        event = "metadata_quarantined",
                        count,
                        path = %path.display(),
                        "Moved invalid metadata entries to quarantine"
                    );
                }
            }
            Err(e) => error!(event = "quarantine_encode_failure", error = %e, "Cannot encode quarantine sidecar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, message_id: i64) -> FileRecord {
        FileRecord {
            file_name: name.to_string(),
            message_id,
            file_size: 1024,
            upload_date: "2026-01-05T12:00:00+00:00".to_string(),
            file_hash: "ab".repeat(32),
        }
    }

    #[test]
    fn load_missing_file_returns_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::load(dir.path().join("files.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.json");

        let mut store = FileStore::load(path.clone());
        store.append(record("a.pdf", 1));
        store.append(record("b.pdf", 2));
        store.append(record("c.pdf", 3));
        store.remove("b.pdf");
        store.persist().unwrap();

        let reloaded = FileStore::load(path);
        assert_eq!(reloaded.records(), store.records());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.records()[0].file_name, "a.pdf");
        assert_eq!(reloaded.records()[1].file_name, "c.pdf");
    }

    #[test]
    fn remove_of_absent_name_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::load(dir.path().join("files.json"));
        store.append(record("keep.txt", 1));

        assert!(!store.remove("missing.txt"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_names_are_kept_and_first_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::load(dir.path().join("files.json"));
        store.append(record("dup.txt", 1));
        store.append(record("dup.txt", 2));

        assert_eq!(store.len(), 2);
        assert_eq!(store.find("dup.txt").unwrap().message_id, 1);

        // Removing also hits the first match only.
        assert!(store.remove("dup.txt"));
        assert_eq!(store.find("dup.txt").unwrap().message_id, 2);
    }

    #[test]
    fn invalid_entries_are_quarantined_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.json");
        let good = record("good.txt", 5);
        let doc = serde_json::json!([
            good,
            { "file_name": "", "message_id": 1, "file_size": 1, "upload_date": "x", "file_hash": "ab" },
            { "not": "a record" },
        ]);
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let store = FileStore::load(path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0], good);

        let sidecar = dir.path().join(QUARANTINE_FILE);
        let quarantined: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(quarantined.len(), 2);
    }

    #[test]
    fn unparsable_document_is_quarantined_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.json");
        std::fs::write(&path, "{ definitely not an array").unwrap();

        let store = FileStore::load(path);
        assert!(store.is_empty());
        assert!(dir.path().join(QUARANTINE_FILE).exists());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("files.json");
        let doc = serde_json::json!([{
            "file_name": "extra.bin",
            "message_id": 7,
            "file_size": 9,
            "upload_date": "2026-01-05T12:00:00+00:00",
            "file_hash": "cd".repeat(32),
            "some_future_field": true,
        }]);
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let store = FileStore::load(path);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].file_name, "extra.bin");
    }
}
