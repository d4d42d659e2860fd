//! Cooperative cancellation for work units
//!
//! A unit checks its token at each phase boundary and stops early once it is
//! cancelled. Cancellation never interrupts I/O already in flight.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared cancellation flag
///
/// Clones observe the same state.
///
/// # Example
///
/// ```
/// use thumbgrid_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_token = token.clone();
///
/// token.cancel();
/// assert!(worker_token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the non-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every clone of it. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancellation_token_basic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancellation_visible_across_threads() {
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let worker = thread::spawn(move || {
            while !worker_token.is_cancelled() {
                thread::yield_now();
            }
        });

        token.cancel();
        worker.join().unwrap();
    }

    #[test]
    fn test_independent_tokens() {
        let a = CancellationToken::new();
        let b = CancellationToken::default();
        a.cancel();
        assert!(!b.is_cancelled());
    }
}
