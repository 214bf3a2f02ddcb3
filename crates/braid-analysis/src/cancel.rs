//! Cooperative cancellation for long-running kernels.
//!
//! Phase-2 deadlines are enforced by a coordinator that stops *waiting* when
//! a timer expires; the kernel thread itself keeps running until it notices
//! the flag. Every iterative kernel polls its [`CancelFlag`] once per outer
//! iteration so abandoned workers terminate within the phase-2 budget
//! instead of spinning until process exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-shot, shareable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Return `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear_and_latches() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        let shared = flag.clone();
        shared.cancel();
        assert!(flag.is_cancelled());

        // Idempotent.
        flag.cancel();
        assert!(flag.is_cancelled());
    }
}
