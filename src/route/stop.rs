//! Cooperative cancellation (§5): a level-triggered stop flag plus an
//! optional monotonic deadline, threaded through the maze search and the
//! pass controller so a caller can abort a long-running batch from another
//! thread without the core needing to know who's asking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cheaply clonable; every clone shares the same underlying flag, so
/// setting it from one handle is visible to every search in flight.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag. Cancellation is level-triggered, so a token can be
    /// reused across batches once reset.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    /// A deadline of zero duration: elapsed immediately, for testing
    /// invariant 13 (§8) without a real clock race.
    pub fn expired() -> Self {
        Self::after(Duration::ZERO)
    }

    pub fn elapsed(&self) -> bool {
        self.0.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_token_shared_across_clones() {
        let a = StopToken::new();
        let b = a.clone();
        assert!(!b.is_stopped());
        a.stop();
        assert!(b.is_stopped());
        b.reset();
        assert!(!a.is_stopped());
    }

    #[test]
    fn test_no_deadline_never_elapses() {
        assert!(!Deadline::none().elapsed());
    }

    #[test]
    fn test_expired_deadline_has_elapsed() {
        assert!(Deadline::expired().elapsed());
    }
}
