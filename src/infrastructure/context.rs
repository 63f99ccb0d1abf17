//! Explicit-carrier propagation context.
//!
//! `ContextCarrier` is a propagation context that lives in a value the caller
//! passes along with the request, rather than in thread-local storage. It keeps
//! registered listener contexts in registration order and lets downstream code
//! look them up by type.

use crate::application::ports::{ContextSupplier, PropagationContext};
use crate::domain::listener::ListenerContext;
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Request-scoped list of registered listener contexts.
///
/// # Example
///
/// ```
/// use limit_outcome::{ContextCarrier, ListenerContext, PropagationContext};
///
/// let carrier = ContextCarrier::new();
/// carrier.register(ListenerContext::new(42_u64));
/// carrier.register(ListenerContext::new(String::from("span-7")));
///
/// assert_eq!(carrier.len(), 2);
/// assert_eq!(*carrier.find::<String>().unwrap(), "span-7");
/// ```
#[derive(Debug, Default)]
pub struct ContextCarrier {
    entries: Mutex<Vec<ListenerContext>>,
}

impl ContextCarrier {
    /// Create an empty carrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// A supplier that always yields this carrier.
    pub fn supplier(carrier: &Arc<ContextCarrier>) -> impl ContextSupplier + 'static {
        let carrier = Arc::clone(carrier);
        move || Arc::clone(&carrier) as Arc<dyn PropagationContext>
    }

    /// All registered contexts, in registration order.
    pub fn contexts(&self) -> Vec<ListenerContext> {
        self.entries().clone()
    }

    /// The first registered context holding a `T`.
    pub fn find<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries().iter().find_map(|c| c.downcast::<T>())
    }

    /// Every registered context holding a `T`, in registration order.
    pub fn find_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.entries()
            .iter()
            .filter_map(|c| c.downcast::<T>())
            .collect()
    }

    /// Number of registered contexts.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Remove and return all registered contexts.
    pub fn drain(&self) -> Vec<ListenerContext> {
        std::mem::take(&mut *self.entries())
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ListenerContext>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PropagationContext for ContextCarrier {
    fn register(&self, context: ListenerContext) {
        self.entries().push(context);
    }
}
