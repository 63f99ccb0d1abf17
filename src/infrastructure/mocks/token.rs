//! Token that counts releases.

use crate::application::ports::LimitToken;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Plain (not outcome-aware) token that counts how often it was released.
#[derive(Debug, Default)]
pub struct CountingToken {
    releases: AtomicUsize,
}

impl CountingToken {
    /// Create a token with no releases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `release` calls so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl LimitToken for CountingToken {
    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
