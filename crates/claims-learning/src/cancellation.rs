//! Cooperative cancellation for model training.
//!
//! Training fits up to six models back to back; the trainer checks a
//! [`CancellationToken`] before each fit and stops with
//! [`LearningError::Cancelled`] once it has been triggered.
//!
//! # Example
//!
//! ```
//! use claims_learning::CancellationToken;
//!
//! let token = CancellationToken::new();
//! assert!(token.check().is_ok());
//!
//! token.cancel();
//! assert!(token.check().is_err());
//!
//! token.reset();
//! assert!(!token.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LearningError, Result};

/// Shared cancellation flag.
///
/// Clones share the same flag, so a token handed to a training thread can be
/// cancelled from the caller's thread.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

// Tokens cross into the thread running the pipeline
static_assertions::assert_impl_all!(CancellationToken: Send, Sync);

impl CancellationToken {
    /// Creates a token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns `Err(LearningError::Cancelled)` once cancellation was requested.
    ///
    /// Meant for `?` at the checkpoints between long-running steps.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LearningError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_default_not_cancelled() {
        let token = CancellationToken::default();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancellation_token_check_after_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(token.check(), Err(LearningError::Cancelled)));
    }

    #[test]
    fn test_cancellation_token_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token1.cancel();
        assert!(token2.is_cancelled());

        token2.reset();
        assert!(!token1.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_across_threads() {
        use std::thread;

        let token = CancellationToken::new();
        let token_clone = token.clone();

        let handle = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(20));
            token_clone.cancel();
        });
        handle.join().unwrap();

        assert!(token.is_cancelled());
    }
}
