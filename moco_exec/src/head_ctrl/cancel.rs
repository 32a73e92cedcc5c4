//! Cancellation token for the heading loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag shared between the heading loop and whoever may want to stop it.
///
/// Cloning the token shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The loop notices on its next tick.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_across_threads() {
        let token = CancelToken::new();
        let remote = token.clone();

        thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }
}
