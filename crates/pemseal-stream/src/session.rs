//! Per-session cooperative cancellation and byte accounting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Command side of a processing session: requests a cooperative stop.
///
/// Cloneable and shareable across threads. The flag is owned by one session
/// and observed only between chunks.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to stop before its next chunk.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Transient state of one file transformation.
#[derive(Debug)]
pub(crate) struct ProcessingSession {
    stop: StopHandle,
    processed: u64,
}

impl ProcessingSession {
    pub(crate) fn new(stop: StopHandle) -> Self {
        Self { stop, processed: 0 }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// Record `delta` input bytes and return the new cumulative total.
    pub(crate) fn advance(&mut self, delta: u64) -> u64 {
        self.processed += delta;
        self.processed
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stop_requested());

        clone.request_stop();
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn test_stop_from_other_thread() {
        let handle = StopHandle::new();
        let remote = handle.clone();
        std::thread::spawn(move || remote.request_stop())
            .join()
            .unwrap();
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn test_independent_handles() {
        let a = StopHandle::new();
        let b = StopHandle::new();
        a.request_stop();
        assert!(!b.is_stop_requested());
    }

    #[test]
    fn test_session_advance() {
        let mut session = ProcessingSession::new(StopHandle::new());
        assert_eq!(session.advance(446), 446);
        assert_eq!(session.advance(100), 546);
        assert_eq!(session.processed(), 546);
        assert!(!session.should_stop());
    }
}
