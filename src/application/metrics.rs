//! Counters describing the dispatcher's own activity.
//!
//! These count dispatch calls, not the work being limited; decision-level
//! metrics belong in a listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Dispatch statistics.
///
/// All counters use atomic operations and can be read at any time. Clones share
/// the same counters.
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    inner: Arc<DispatchMetricsInner>,
}

#[derive(Debug)]
struct DispatchMetricsInner {
    /// Accepted decisions dispatched to listeners
    decisions_accepted: AtomicU64,
    /// Rejected decisions dispatched to listeners
    decisions_rejected: AtomicU64,
    /// Dispatch calls skipped because no context supplier was configured
    dispatches_skipped: AtomicU64,
    /// Listener contexts registered into propagation contexts
    contexts_registered: AtomicU64,
}

impl DispatchMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatchMetricsInner {
                decisions_accepted: AtomicU64::new(0),
                decisions_rejected: AtomicU64::new(0),
                dispatches_skipped: AtomicU64::new(0),
                contexts_registered: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_accepted(&self) {
        self.inner.decisions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.decisions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.inner.dispatches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registrations(&self, count: usize) {
        self.inner
            .contexts_registered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Accepted decisions dispatched to listeners.
    pub fn decisions_accepted(&self) -> u64 {
        self.inner.decisions_accepted.load(Ordering::Relaxed)
    }

    /// Rejected decisions dispatched to listeners.
    pub fn decisions_rejected(&self) -> u64 {
        self.inner.decisions_rejected.load(Ordering::Relaxed)
    }

    /// Dispatch calls skipped for lack of a context supplier.
    pub fn dispatches_skipped(&self) -> u64 {
        self.inner.dispatches_skipped.load(Ordering::Relaxed)
    }

    /// Listener contexts registered into propagation contexts.
    pub fn contexts_registered(&self) -> u64 {
        self.inner.contexts_registered.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            decisions_accepted: self.decisions_accepted(),
            decisions_rejected: self.decisions_rejected(),
            dispatches_skipped: self.dispatches_skipped(),
            contexts_registered: self.contexts_registered(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.decisions_accepted.store(0, Ordering::Relaxed);
        self.inner.decisions_rejected.store(0, Ordering::Relaxed);
        self.inner.dispatches_skipped.store(0, Ordering::Relaxed);
        self.inner.contexts_registered.store(0, Ordering::Relaxed);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of dispatch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    /// Accepted decisions dispatched to listeners
    pub decisions_accepted: u64,
    /// Rejected decisions dispatched to listeners
    pub decisions_rejected: u64,
    /// Dispatch calls skipped for lack of a context supplier
    pub dispatches_skipped: u64,
    /// Listener contexts registered into propagation contexts
    pub contexts_registered: u64,
}

impl DispatchMetricsSnapshot {
    /// Decisions that reached listeners (accepted + rejected).
    pub fn total_dispatched(&self) -> u64 {
        self.decisions_accepted
            .saturating_add(self.decisions_rejected)
    }

    /// Ratio of rejected to dispatched decisions (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been dispatched.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_dispatched();
        if total == 0 {
            0.0
        } else {
            self.decisions_rejected as f64 / total as f64
        }
    }
}
