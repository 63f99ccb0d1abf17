//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports; limiters and
//! request-context implementations outside this crate can implement them too.

use crate::domain::listener::ListenerContext;
use crate::domain::outcome::AcceptedDecision;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for a capacity token handed out by a limiter on acceptance.
///
/// Issuing and releasing capacity belongs to the limiter. The only thing the
/// dispatcher needs from a token is the optional outcome-aware capability.
pub trait LimitToken: Send + Sync {
    /// Return the admission slot to the limiter.
    fn release(&self);

    /// Expose the outcome-aware capability, if this token has it.
    ///
    /// Tokens without it are left untouched by dispatch.
    fn as_outcome_aware(&self) -> Option<&dyn OutcomeAware> {
        None
    }
}

/// Capability of a token that can carry its accepted decision.
///
/// Whoever later releases the token retrieves the decision from it and drives
/// [`AcceptedDecision::finish`].
pub trait OutcomeAware: Send + Sync {
    /// Attach the decision built for this token's acceptance.
    fn attach_outcome(&self, decision: Arc<AcceptedDecision>);
}

/// Port for the request- or thread-scoped registry that publishes listener
/// contexts to downstream code.
///
/// Whether registration merges or replaces, and where the registry lives, is
/// up to the implementation.
pub trait PropagationContext: Send + Sync {
    /// Publish one listener context.
    fn register(&self, context: ListenerContext);
}

/// Port yielding the propagation context current for the caller.
///
/// Called once per dispatch. Any `Fn() -> Arc<dyn PropagationContext>` closure
/// is a supplier.
pub trait ContextSupplier: Send + Sync {
    /// The propagation context to register into.
    fn current(&self) -> Arc<dyn PropagationContext>;
}

impl<F> ContextSupplier for F
where
    F: Fn() -> Arc<dyn PropagationContext> + Send + Sync,
{
    fn current(&self) -> Arc<dyn PropagationContext> {
        self()
    }
}
