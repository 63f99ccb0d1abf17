//! # limit-outcome
//!
//! Outcome notification for concurrency and rate limiter decisions.
//!
//! A limiter decides whether a unit of work may run. This crate tells
//! interested parties about that decision and, for accepted work, about how
//! the work eventually went. Listeners are notified in order when the decision
//! is made; each may hand back a context object, which is kept next to the
//! listener, registered into the caller's propagation context for downstream
//! code, and handed back to the same listener when the work finishes.
//!
//! ## Quick Start
//!
//! ```rust
//! use limit_outcome::{
//!     ContextCarrier, ExecutionResult, ListenerRegistry, NoopToken,
//!     OutcomeDispatcher, OutcomeToken, TracingListener,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! // Listeners are assembled once, at limiter construction time.
//! let registry = ListenerRegistry::new();
//! registry.register(Arc::new(TracingListener::new()));
//!
//! // The carrier travels with the request and receives listener contexts.
//! let carrier = Arc::new(ContextCarrier::new());
//! let dispatcher = OutcomeDispatcher::builder("checkout", "vegas")
//!     .with_context_supplier(ContextCarrier::supplier(&carrier))
//!     .build()
//!     .unwrap();
//!
//! // The limiter accepted: notify listeners and bind the decision to the token.
//! let token = OutcomeToken::new(NoopToken);
//! dispatcher
//!     .dispatch_accepted(&registry.enabled_listeners(), &token)
//!     .unwrap();
//! assert_eq!(carrier.len(), 1);
//!
//! // Later, when the work is done, completing the token runs the finish phase.
//! token
//!     .complete(ExecutionResult::success(Duration::from_millis(12)))
//!     .unwrap();
//! ```
//!
//! ## Decisions
//!
//! Every decision is one of four shapes: immediate accept, immediate reject,
//! deferred accept and deferred reject. Deferred decisions carry the
//! `[wait_start, wait_end]` interval the caller spent waiting for capacity.
//! Accepted decisions additionally have a finish phase, which delivers an
//! [`ExecutionResult`] to every listener together with the context that
//! listener returned.
//!
//! ## Switching Dispatch Off
//!
//! A dispatcher built without a context supplier is inactive: every entry
//! point returns `Ok(None)` without calling listeners, touching the token, or
//! producing a decision. Limiters can keep the dispatch calls in place and
//! decide at construction time whether notification happens.
//!
//! ## Errors
//!
//! Listener failures are not isolated. The first listener error aborts the
//! current pass and is returned as [`OutcomeError::Listener`], naming the
//! listener and the phase. Listeners after the failing one are not notified
//! for that pass.
//!
//! ## Observability
//!
//! [`DispatchMetrics`] counts accepted, rejected and skipped dispatches and
//! the number of contexts registered:
//!
//! ```rust
//! use limit_outcome::OutcomeDispatcher;
//!
//! let dispatcher = OutcomeDispatcher::builder("checkout", "vegas")
//!     .with_context_supplier(limit_outcome::ContextCarrier::supplier(
//!         &std::sync::Arc::new(limit_outcome::ContextCarrier::new()),
//!     ))
//!     .build()
//!     .unwrap();
//! dispatcher.dispatch_rejected(&[]).unwrap();
//!
//! let snapshot = dispatcher.metrics().snapshot();
//! assert_eq!(snapshot.decisions_rejected, 1);
//! assert_eq!(snapshot.rejection_rate(), 1.0);
//! ```
//!
//! The crate logs through `tracing`; dispatches are reported at `debug` and
//! skipped dispatches at `trace`.

// Domain layer - pure types
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    decision::{AcceptedView, Decision, DecisionShape, Disposition, WaitTiming},
    execution::ExecutionResult,
    listener::{LimitListener, ListenerContext, ListenerError},
    outcome::{
        AcceptedDecision, LimitDecision, ListenerBinding, ListenerPhase, OutcomeError,
        RejectedDecision,
    },
};

pub use application::{
    dispatcher::{BuildError, OutcomeDispatcher, OutcomeDispatcherBuilder},
    metrics::{DispatchMetrics, DispatchMetricsSnapshot},
    ports::{Clock, ContextSupplier, LimitToken, OutcomeAware, PropagationContext},
    registry::ListenerRegistry,
};

pub use infrastructure::{
    clock::SystemClock,
    context::ContextCarrier,
    token::{NoopToken, OutcomeToken},
    tracing_listener::{AdmissionSpan, TracingListener},
};
