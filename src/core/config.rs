//! Centralized configuration constants for Telestash.
//!
//! All tunable parameters live here so they can be reviewed and adjusted
//! in a single place. Backend-specific values (MTProto session naming,
//! remote API limits) stay in their respective modules.

use std::time::Duration;

// ── Hashing / Streaming ──────────────────────────────────────────────────────

/// Read-buffer size used when streaming a file through SHA-256 and when the
/// loopback backend chunks media for progress reporting (64 KiB).
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

// ── Metadata store ───────────────────────────────────────────────────────────

/// File name of the metadata index inside the data directory.
pub const METADATA_FILE: &str = "files.json";

/// Sidecar file receiving metadata entries that fail validation on load.
pub const QUARANTINE_FILE: &str = "files.quarantine.json";

// ── Remote session ───────────────────────────────────────────────────────────

/// File name of the persisted remote session inside the data directory.
pub const SESSION_FILE: &str = "telestash.session";

// ── UI / Misc ────────────────────────────────────────────────────────────────

/// How long the UI waits for a key event before running a tick
/// (draining worker channels, expiring notifications).
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum log entries kept in the in-memory ring buffer.
pub const MAX_LOG_ENTRIES: usize = 500;

/// Notification time-to-live per severity.
pub const NOTIFY_TTL_INFO: Duration = Duration::from_secs(5);
pub const NOTIFY_TTL_WARNING: Duration = Duration::from_secs(8);
pub const NOTIFY_TTL_ERROR: Duration = Duration::from_secs(10);
