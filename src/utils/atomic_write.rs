//! Atomic file write utility.
//!
//! Single implementation of the write-to-temp-then-rename pattern used for
//! every persistent state file (metadata index, quarantine sidecar).
//!
//! Invariants:
//! - Content goes to a sibling `.tmp` file first; an atomic rename then
//!   replaces the target.
//! - On rename failure the temp file is removed so no stale artifact remains.
//! - Parent directories are created if absent.
//!
//! `rename()` is atomic on ext4, NTFS, APFS, and all major filesystems when
//! source and destination share a mount.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::error;

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically write `content` to `path` via a temporary file and rename.
///
/// # Errors
/// Returns an error if the temp file cannot be written or the rename fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let tmp_path = temp_sibling(path);

    std::fs::write(&tmp_path, content).map_err(|e| {
        error!(
            event = "atomic_write_failure",
            path = %tmp_path.display(),
            error = %e,
            "Failed to write temp file"
        );
        e
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        error!(
            event = "atomic_rename_failure",
            from = %tmp_path.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file"
        );
        let _ = std::fs::remove_file(&tmp_path);
        e
    })?;

    Ok(())
}
