//! The contract every observer of limiter decisions implements.
//!
//! A listener sees each decision once (accept or reject hook) and may hand back
//! a [`ListenerContext`]. For accepted decisions, the same context is passed to
//! the finish hook once the protected work completes, which lets a listener
//! correlate the two calls (for example, a tracing span opened on accept and
//! closed on finish).

use crate::domain::decision::{AcceptedView, Decision};
use crate::domain::execution::ExecutionResult;
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Opaque correlation object returned by a listener.
///
/// Cheap to clone; clones share the same value. Listeners recover their own
/// type with [`downcast_ref`](Self::downcast_ref) or [`downcast`](Self::downcast).
#[derive(Clone)]
pub struct ListenerContext(Arc<dyn Any + Send + Sync>);

impl ListenerContext {
    /// Wrap a value as a listener context.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an already shared value.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Check if the context holds a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Borrow the value as `T`, if that is what it holds.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Get a shared handle to the value as `T`, if that is what it holds.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    /// Check if two contexts share the same value.
    pub fn ptr_eq(&self, other: &ListenerContext) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ListenerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerContext").finish_non_exhaustive()
    }
}

/// Error raised by a listener hook.
///
/// Listener errors are not isolated: the first one aborts the current
/// notification pass and is returned to whoever triggered it.
#[derive(Debug)]
pub struct ListenerError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ListenerError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an error with a message and an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ListenerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Observer of limiter decisions.
///
/// Hooks run synchronously on the thread that reached the decision (accept and
/// reject) or completed the work (finish). They must be fast and must not block.
///
/// # Example
///
/// ```
/// use limit_outcome::{
///     AcceptedView, Decision, ExecutionResult, LimitListener, ListenerContext, ListenerError,
/// };
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// #[derive(Default)]
/// struct RejectCounter {
///     rejected: AtomicU64,
/// }
///
/// impl LimitListener for RejectCounter {
///     fn name(&self) -> &str {
///         "reject-counter"
///     }
///
///     fn on_accept(&self, _decision: AcceptedView<'_>) -> Result<Option<ListenerContext>, ListenerError> {
///         Ok(None)
///     }
///
///     fn on_reject(&self, _decision: &Decision) -> Result<Option<ListenerContext>, ListenerError> {
///         self.rejected.fetch_add(1, Ordering::Relaxed);
///         Ok(None)
///     }
///
///     fn on_finish(
///         &self,
///         _context: Option<&ListenerContext>,
///         _result: &ExecutionResult,
///     ) -> Result<(), ListenerError> {
///         Ok(())
///     }
/// }
/// ```
pub trait LimitListener: Send + Sync {
    /// Stable name used to register and look up the listener.
    fn name(&self) -> &str;

    /// Whether the listener should currently be handed decisions.
    ///
    /// The dispatcher does not consult this; whoever assembles the listener
    /// list does (see [`ListenerRegistry::enabled_listeners`](crate::ListenerRegistry::enabled_listeners)).
    fn enabled(&self) -> bool {
        true
    }

    /// Called once per accepted decision.
    ///
    /// The returned context is handed back to [`on_finish`](Self::on_finish).
    fn on_accept(&self, decision: AcceptedView<'_>)
        -> Result<Option<ListenerContext>, ListenerError>;

    /// Called once per rejected decision. No finish call will follow.
    fn on_reject(&self, decision: &Decision) -> Result<Option<ListenerContext>, ListenerError>;

    /// Called once the work admitted by an accepted decision has completed.
    ///
    /// `context` is whatever this listener returned from `on_accept`.
    fn on_finish(
        &self,
        context: Option<&ListenerContext>,
        result: &ExecutionResult,
    ) -> Result<(), ListenerError>;
}
