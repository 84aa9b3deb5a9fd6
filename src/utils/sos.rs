//! Signal-of-Stop: cooperative shutdown flag.
//!
//! Shared between the UI loop and the Ctrl+C handler. Clones share the same
//! underlying state, so cancelling any clone is visible to all holders.
//! Started worker operations are never cancelled (they run to their
//! terminal event); the signal only ends the foreground loop, after which
//! worker events are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default, Clone)]
pub struct SignalOfStop {
    closing: Arc<AtomicBool>,
}

impl SignalOfStop {
    /// Create a new, uncancelled signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal shutdown to all holders.
    pub fn cancel(&self) {
        self.closing.store(true, Ordering::Release);
    }

    /// Check if shutdown has been signaled.
    pub fn cancelled(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        assert!(!SignalOfStop::new().cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let sos = SignalOfStop::new();
        let clone = sos.clone();
        clone.cancel();
        assert!(sos.cancelled());
    }
}
