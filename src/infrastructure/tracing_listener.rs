//! Listener that reports decisions through `tracing`.
//!
//! Every accepted decision opens a `limit.admission` span. The span travels as
//! the listener's context: it is registered into the propagation context, so
//! downstream code can enter it, and it comes back at finish time, when the
//! outcome and the time the slot was held are recorded on it. Rejections are
//! reported as a single event.

use crate::application::ports::Clock;
use crate::domain::decision::{AcceptedView, Decision};
use crate::domain::execution::ExecutionResult;
use crate::domain::listener::{LimitListener, ListenerContext, ListenerError};
use crate::infrastructure::clock::SystemClock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::field;
use tracing::Span;

/// Context returned by [`TracingListener`] for accepted decisions.
#[derive(Debug, Clone)]
pub struct AdmissionSpan {
    span: Span,
    accepted_at: Instant,
}

impl AdmissionSpan {
    /// The span opened for the admission.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// When the decision was dispatched.
    pub fn accepted_at(&self) -> Instant {
        self.accepted_at
    }
}

/// Reports limiter decisions as `tracing` spans and events.
///
/// # Example
///
/// ```
/// use limit_outcome::{ListenerRegistry, TracingListener};
/// use std::sync::Arc;
///
/// let registry = ListenerRegistry::new();
/// registry.register(Arc::new(TracingListener::new().with_name("admission-tracing")));
/// assert_eq!(registry.names(), vec!["admission-tracing"]);
/// ```
pub struct TracingListener {
    name: String,
    enabled: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl TracingListener {
    /// Create an enabled listener named `tracing` using the system clock.
    pub fn new() -> Self {
        Self {
            name: "tracing".to_string(),
            enabled: AtomicBool::new(true),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Register under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Turn the listener on or off for subsequently assembled listener lists.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl Default for TracingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TracingListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingListener")
            .field("name", &self.name)
            .field("enabled", &self.enabled())
            .field("clock", &self.clock)
            .finish()
    }
}

fn waited_nanos(decision: &Decision) -> u64 {
    decision.wait_timing().map_or(0, |t| t.waited_nanos())
}

impl LimitListener for TracingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn on_accept(
        &self,
        decision: AcceptedView<'_>,
    ) -> Result<Option<ListenerContext>, ListenerError> {
        let span = tracing::info_span!(
            "limit.admission",
            origin = %decision.origin_name(),
            algorithm = %decision.algorithm_type(),
            shape = decision.shape().as_str(),
            waited_ns = waited_nanos(&decision),
            outcome = field::Empty,
            held_us = field::Empty,
        );

        Ok(Some(ListenerContext::new(AdmissionSpan {
            span,
            accepted_at: self.clock.now(),
        })))
    }

    fn on_reject(&self, decision: &Decision) -> Result<Option<ListenerContext>, ListenerError> {
        tracing::info!(
            origin = %decision.origin_name(),
            algorithm = %decision.algorithm_type(),
            shape = decision.shape().as_str(),
            waited_ns = waited_nanos(decision),
            "admission rejected"
        );
        Ok(None)
    }

    fn on_finish(
        &self,
        context: Option<&ListenerContext>,
        result: &ExecutionResult,
    ) -> Result<(), ListenerError> {
        let Some(admission) = context.and_then(|c| c.downcast_ref::<AdmissionSpan>()) else {
            return Err(ListenerError::new(
                "finish called without the admission span returned on accept",
            ));
        };

        let held = self
            .clock
            .now()
            .saturating_duration_since(admission.accepted_at);
        let held_us: u64 = held.as_micros().try_into().unwrap_or(u64::MAX);

        admission.span.record("outcome", result.kind());
        admission.span.record("held_us", held_us);

        match result {
            ExecutionResult::Failure { cause, .. } => {
                tracing::warn!(parent: &admission.span, cause = %cause, "admitted work failed");
            }
            other => {
                tracing::info!(parent: &admission.span, outcome = other.kind(), "admitted work finished");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::OutcomeDispatcher;
    use crate::domain::outcome::LimitDecision;
    use crate::infrastructure::context::ContextCarrier;
    use crate::infrastructure::mocks::{MockCaptureLayer, MockClock, NamedValue};
    use crate::infrastructure::token::{NoopToken, OutcomeToken};
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    const TARGET: &str = "limit_outcome::infrastructure::tracing_listener";

    fn dispatcher(carrier: &Arc<ContextCarrier>) -> OutcomeDispatcher {
        OutcomeDispatcher::builder("search", "gradient2")
            .with_context_supplier(ContextCarrier::supplier(carrier))
            .build()
            .unwrap()
    }

    #[test]
    fn test_accept_opens_span_and_finish_records_outcome() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let clock = Arc::new(MockClock::new(Instant::now()));
        let listener: Arc<dyn LimitListener> =
            Arc::new(TracingListener::new().with_clock(clock.clone()));
        let carrier = Arc::new(ContextCarrier::new());

        tracing::subscriber::with_default(subscriber, || {
            let token = OutcomeToken::new(NoopToken);
            dispatcher(&carrier)
                .dispatch_deferred_accepted(&[listener], &token, 100, 2_100)
                .unwrap();
            clock.advance(Duration::from_micros(750));
            token
                .complete(ExecutionResult::success(Duration::from_micros(750)))
                .unwrap();
        });

        let spans = capture.spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "limit.admission");
        assert_eq!(span.field("origin"), Some("search"));
        assert_eq!(span.field("shape"), Some("deferred_accept"));
        assert_eq!(span.field("waited_ns"), Some("2000"));
        assert_eq!(span.field("outcome"), Some("success"));
        assert_eq!(span.field("held_us"), Some("750"));

        let events = capture.events_for(TARGET);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "admitted work finished");
        assert_eq!(events[0].span.as_deref(), Some("limit.admission"));
    }

    #[test]
    fn test_span_is_registered_for_downstream_code() {
        let listener: Arc<dyn LimitListener> = Arc::new(TracingListener::new());
        let carrier = Arc::new(ContextCarrier::new());

        dispatcher(&carrier)
            .dispatch_accepted(&[listener], &NoopToken)
            .unwrap();

        let admission = carrier.find::<AdmissionSpan>().unwrap();
        assert!(admission.accepted_at() <= Instant::now());
        let _ = admission.span();
    }

    #[test]
    fn test_reject_emits_event_without_context() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let listener: Arc<dyn LimitListener> = Arc::new(TracingListener::new());
        let carrier = Arc::new(ContextCarrier::new());

        let decision = tracing::subscriber::with_default(subscriber, || {
            dispatcher(&carrier).dispatch_rejected(&[listener]).unwrap()
        });

        let decision = decision.unwrap();
        assert!(decision.bindings().iter().all(|b| b.context().is_none()));
        assert!(carrier.is_empty());

        let events = capture.events_for(TARGET);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "admission rejected");
        assert!(events[0]
            .fields
            .contains(&NamedValue::new("shape", "immediate_reject")));
    }

    #[test]
    fn test_failure_is_reported_as_warning() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let listener: Arc<dyn LimitListener> = Arc::new(TracingListener::new());
        let carrier = Arc::new(ContextCarrier::new());

        tracing::subscriber::with_default(subscriber, || {
            let decision = dispatcher(&carrier)
                .dispatch_accepted(&[listener], &NoopToken)
                .unwrap()
                .unwrap();
            decision
                .finish(ExecutionResult::failure(Duration::from_millis(1), "upstream 503"))
                .unwrap();
        });

        let events = capture.events_for(TARGET);
        assert_eq!(events[0].level, tracing::Level::WARN);
        assert!(events[0]
            .fields
            .contains(&NamedValue::new("cause", "upstream 503")));
        assert_eq!(capture.spans()[0].field("outcome"), Some("failure"));
    }

    #[test]
    fn test_finish_without_admission_span_fails() {
        let listener = TracingListener::new();
        let err = listener
            .on_finish(None, &ExecutionResult::Ignored)
            .unwrap_err();
        assert!(err.message().contains("admission span"));
    }

    #[test]
    fn test_enabled_toggle() {
        let listener = TracingListener::new().with_name("spans");
        assert_eq!(listener.name(), "spans");
        assert!(listener.enabled());
        listener.set_enabled(false);
        assert!(!listener.enabled());
    }
}
