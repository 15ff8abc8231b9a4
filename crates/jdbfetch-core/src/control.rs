//! Cancellation tokens shared between the entry point, the engine and workers.
//!
//! A token is a shared atomic flag. Child tokens observe every ancestor's flag
//! in addition to their own, so the engine can cancel one run's in-flight
//! transfers without flipping the caller's token, while a caller-level
//! cancel (e.g. Ctrl-C) still reaches every worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is cancelled when either it or `self` is cancelled.
    /// Cancelling the child does not cancel `self`.
    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.flag));
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.ancestors.iter().any(|a| a.load(Ordering::Relaxed))
    }
}
