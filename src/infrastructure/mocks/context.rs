//! Context supplier that counts how often it is asked for a context.

use crate::application::ports::{ContextSupplier, PropagationContext};
use crate::infrastructure::context::ContextCarrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Supplier yielding one shared [`ContextCarrier`] and counting its calls.
#[derive(Debug, Default)]
pub struct CountingSupplier {
    carrier: Arc<ContextCarrier>,
    calls: AtomicUsize,
}

impl CountingSupplier {
    /// Create a supplier around a fresh carrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `current` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The carrier every call yields.
    pub fn carrier(&self) -> &Arc<ContextCarrier> {
        &self.carrier
    }
}

impl ContextSupplier for CountingSupplier {
    fn current(&self) -> Arc<dyn PropagationContext> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Arc::clone(&self.carrier) as Arc<dyn PropagationContext>
    }
}
