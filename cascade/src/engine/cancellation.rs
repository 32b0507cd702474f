//! Cooperative cancellation of render passes.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// A token for cooperative cancellation of an in-progress render pass.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
/// The engine checks the token between node visits; a cancelled pass unwinds
/// all pushed bindings through the scoped-acquisition guards before
/// surfacing the abort.
#[derive(Debug, Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Resets the token (for testing).
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        *self.reason.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel("first");
        token.cancel("second");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("first".to_string()));
    }

    #[test]
    fn test_reset() {
        let token = CancellationToken::new();
        token.cancel("boom");
        token.reset();

        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
    }
}
