//! Fan-out of limiter decisions to listeners.
//!
//! The dispatcher is called by a limiter right after it decides. Each of the
//! four entry points notifies every listener in order, collects the contexts
//! they return, builds the finished decision, attaches accepted decisions to
//! outcome-aware tokens, and registers the collected contexts into the
//! caller's propagation context.
//!
//! Without a context supplier the dispatcher is switched off: every entry point
//! returns `Ok(None)` without touching listeners, tokens or contexts.

use crate::application::metrics::DispatchMetrics;
use crate::application::ports::{ContextSupplier, LimitToken};
use crate::domain::decision::{AcceptedView, Decision, WaitTiming};
use crate::domain::listener::LimitListener;
use crate::domain::outcome::{
    AcceptedDecision, LimitDecision, ListenerBinding, ListenerPhase, OutcomeError,
    RejectedDecision,
};
use std::fmt;
use std::sync::Arc;

/// Error returned when building an `OutcomeDispatcher` fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Origin name must not be empty
    EmptyOriginName,
    /// Algorithm type must not be empty
    EmptyAlgorithmType,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyOriginName => write!(f, "origin name must not be empty"),
            BuildError::EmptyAlgorithmType => write!(f, "algorithm type must not be empty"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Builder for constructing an `OutcomeDispatcher`.
pub struct OutcomeDispatcherBuilder {
    origin_name: String,
    algorithm_type: String,
    context_supplier: Option<Arc<dyn ContextSupplier>>,
    metrics: Option<DispatchMetrics>,
}

impl OutcomeDispatcherBuilder {
    /// Set the supplier of the propagation context to register listener
    /// contexts into.
    ///
    /// Leaving it unset disables dispatch entirely.
    pub fn with_context_supplier<C>(mut self, supplier: C) -> Self
    where
        C: ContextSupplier + 'static,
    {
        self.context_supplier = Some(Arc::new(supplier));
        self
    }

    /// Use a shared context supplier.
    pub fn with_shared_context_supplier(mut self, supplier: Arc<dyn ContextSupplier>) -> Self {
        self.context_supplier = Some(supplier);
        self
    }

    /// Share dispatch counters with other dispatchers or with a reporter.
    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the dispatcher.
    ///
    /// # Errors
    /// Returns `BuildError` if the origin name or algorithm type is blank.
    pub fn build(self) -> Result<OutcomeDispatcher, BuildError> {
        if self.origin_name.trim().is_empty() {
            return Err(BuildError::EmptyOriginName);
        }
        if self.algorithm_type.trim().is_empty() {
            return Err(BuildError::EmptyAlgorithmType);
        }

        Ok(OutcomeDispatcher {
            origin_name: Arc::from(self.origin_name),
            algorithm_type: Arc::from(self.algorithm_type),
            context_supplier: self.context_supplier,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

/// Notifies listeners of one limiter's decisions.
///
/// A dispatcher belongs to one limiter instance: origin name and algorithm
/// type are fixed at build time, while the listener list is passed on every
/// call so the caller controls which listeners take part.
///
/// The dispatcher holds no per-call state; a shared reference may be used from
/// any number of threads at once.
///
/// # Example
///
/// ```
/// use limit_outcome::{ContextCarrier, ExecutionResult, NoopToken, OutcomeDispatcher, OutcomeToken};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let carrier = Arc::new(ContextCarrier::new());
/// let dispatcher = OutcomeDispatcher::builder("orders-api", "fixed")
///     .with_context_supplier(ContextCarrier::supplier(&carrier))
///     .build()
///     .unwrap();
///
/// let token = OutcomeToken::new(NoopToken);
/// let decision = dispatcher.dispatch_accepted(&[], &token).unwrap().unwrap();
/// assert!(Arc::ptr_eq(&decision, token.outcome().unwrap()));
///
/// token.complete(ExecutionResult::success(Duration::from_millis(3))).unwrap();
/// assert!(decision.is_finished());
/// ```
#[derive(Clone)]
pub struct OutcomeDispatcher {
    origin_name: Arc<str>,
    algorithm_type: Arc<str>,
    context_supplier: Option<Arc<dyn ContextSupplier>>,
    metrics: DispatchMetrics,
}

impl OutcomeDispatcher {
    /// Start building a dispatcher for a limiter instance.
    pub fn builder(
        origin_name: impl Into<String>,
        algorithm_type: impl Into<String>,
    ) -> OutcomeDispatcherBuilder {
        OutcomeDispatcherBuilder {
            origin_name: origin_name.into(),
            algorithm_type: algorithm_type.into(),
            context_supplier: None,
            metrics: None,
        }
    }

    /// Name of the limiter instance this dispatcher reports for.
    pub fn origin_name(&self) -> &str {
        &self.origin_name
    }

    /// Identity of the limiting algorithm.
    pub fn algorithm_type(&self) -> &str {
        &self.algorithm_type
    }

    /// Check if dispatch is active (a context supplier is configured).
    pub fn is_active(&self) -> bool {
        self.context_supplier.is_some()
    }

    /// Get a reference to the dispatch counters.
    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Dispatch a decision accepted without waiting.
    ///
    /// Returns the finished-at-dispatch decision, or `None` when dispatch is
    /// inactive.
    ///
    /// # Errors
    /// Returns `OutcomeError::Listener` from the first failing `on_accept`. The
    /// listeners after it are not called, the token is not annotated and no
    /// context is registered.
    pub fn dispatch_accepted(
        &self,
        listeners: &[Arc<dyn LimitListener>],
        token: &dyn LimitToken,
    ) -> Result<Option<Arc<AcceptedDecision>>, OutcomeError> {
        self.accept(listeners, token, None)
    }

    /// Dispatch a decision accepted after waiting from `wait_start` to
    /// `wait_end` (nanoseconds).
    ///
    /// # Errors
    /// Same as [`dispatch_accepted`](Self::dispatch_accepted).
    pub fn dispatch_deferred_accepted(
        &self,
        listeners: &[Arc<dyn LimitListener>],
        token: &dyn LimitToken,
        wait_start: u64,
        wait_end: u64,
    ) -> Result<Option<Arc<AcceptedDecision>>, OutcomeError> {
        self.accept(listeners, token, Some(WaitTiming::new(wait_start, wait_end)))
    }

    /// Dispatch a decision rejected without waiting.
    ///
    /// # Errors
    /// Returns `OutcomeError::Listener` from the first failing `on_reject`.
    pub fn dispatch_rejected(
        &self,
        listeners: &[Arc<dyn LimitListener>],
    ) -> Result<Option<RejectedDecision>, OutcomeError> {
        self.reject(listeners, None)
    }

    /// Dispatch a decision rejected after waiting from `wait_start` to
    /// `wait_end` (nanoseconds).
    ///
    /// # Errors
    /// Returns `OutcomeError::Listener` from the first failing `on_reject`.
    pub fn dispatch_deferred_rejected(
        &self,
        listeners: &[Arc<dyn LimitListener>],
        wait_start: u64,
        wait_end: u64,
    ) -> Result<Option<RejectedDecision>, OutcomeError> {
        self.reject(listeners, Some(WaitTiming::new(wait_start, wait_end)))
    }

    fn accept(
        &self,
        listeners: &[Arc<dyn LimitListener>],
        token: &dyn LimitToken,
        timing: Option<WaitTiming>,
    ) -> Result<Option<Arc<AcceptedDecision>>, OutcomeError> {
        let Some(supplier) = self.active_supplier(listeners.len()) else {
            return Ok(None);
        };

        let decision = match timing {
            None => Decision::immediate_accepted(
                Arc::clone(&self.origin_name),
                Arc::clone(&self.algorithm_type),
            ),
            Some(timing) => Decision::deferred_accepted(
                Arc::clone(&self.origin_name),
                Arc::clone(&self.algorithm_type),
                timing,
            ),
        };

        let bindings = listeners
            .iter()
            .map(|listener| {
                let context = listener
                    .on_accept(AcceptedView::new(&decision))
                    .map_err(|source| {
                        OutcomeError::listener(listener.name(), ListenerPhase::Accept, source)
                    })?;
                Ok(ListenerBinding::new(Arc::clone(listener), context))
            })
            .collect::<Result<Vec<_>, OutcomeError>>()?;

        let decision = Arc::new(AcceptedDecision::new(decision, bindings));

        let attached = match token.as_outcome_aware() {
            Some(aware) => {
                aware.attach_outcome(Arc::clone(&decision));
                true
            }
            None => false,
        };

        let registered = register_contexts(supplier, decision.bindings());

        self.metrics.record_accepted();
        self.metrics.record_registrations(registered);

        tracing::debug!(
            origin = %self.origin_name,
            algorithm = %self.algorithm_type,
            shape = decision.shape().as_str(),
            listeners = listeners.len(),
            registered,
            attached,
            "dispatched accepted decision"
        );

        Ok(Some(decision))
    }

    fn reject(
        &self,
        listeners: &[Arc<dyn LimitListener>],
        timing: Option<WaitTiming>,
    ) -> Result<Option<RejectedDecision>, OutcomeError> {
        let Some(supplier) = self.active_supplier(listeners.len()) else {
            return Ok(None);
        };

        let decision = match timing {
            None => Decision::immediate_rejected(
                Arc::clone(&self.origin_name),
                Arc::clone(&self.algorithm_type),
            ),
            Some(timing) => Decision::deferred_rejected(
                Arc::clone(&self.origin_name),
                Arc::clone(&self.algorithm_type),
                timing,
            ),
        };

        let bindings = listeners
            .iter()
            .map(|listener| {
                let context = listener.on_reject(&decision).map_err(|source| {
                    OutcomeError::listener(listener.name(), ListenerPhase::Reject, source)
                })?;
                Ok(ListenerBinding::new(Arc::clone(listener), context))
            })
            .collect::<Result<Vec<_>, OutcomeError>>()?;

        let decision = RejectedDecision::new(decision, bindings);
        let registered = register_contexts(supplier, decision.bindings());

        self.metrics.record_rejected();
        self.metrics.record_registrations(registered);

        tracing::debug!(
            origin = %self.origin_name,
            algorithm = %self.algorithm_type,
            shape = decision.shape().as_str(),
            listeners = listeners.len(),
            registered,
            "dispatched rejected decision"
        );

        Ok(Some(decision))
    }

    /// The configured supplier, or `None` after recording a skipped dispatch.
    fn active_supplier(&self, listeners: usize) -> Option<&dyn ContextSupplier> {
        let supplier = self.context_supplier.as_deref();
        if supplier.is_none() {
            self.metrics.record_skipped();
            tracing::trace!(
                origin = %self.origin_name,
                listeners,
                "no context supplier configured; skipping listener dispatch"
            );
        }
        supplier
    }
}

impl fmt::Debug for OutcomeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeDispatcher")
            .field("origin_name", &self.origin_name)
            .field("algorithm_type", &self.algorithm_type)
            .field("active", &self.is_active())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Register every present context, in binding order, into the context obtained
/// from a single supplier call. Returns the number registered.
fn register_contexts(supplier: &dyn ContextSupplier, bindings: &[ListenerBinding]) -> usize {
    let propagation = supplier.current();
    let mut registered = 0;
    for context in bindings.iter().filter_map(ListenerBinding::context) {
        propagation.register(context.clone());
        registered += 1;
    }

    tracing::trace!(registered, "registered listener contexts");
    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{DecisionShape, Disposition};
    use crate::domain::execution::ExecutionResult;
    use crate::infrastructure::context::ContextCarrier;
    use crate::infrastructure::mocks::{
        CallLog, CountingSupplier, CountingToken, ListenerCall, RecordingListener,
    };
    use crate::infrastructure::token::OutcomeToken;
    use std::time::Duration;

    fn listeners(list: &[&Arc<RecordingListener>]) -> Vec<Arc<dyn LimitListener>> {
        list.iter()
            .map(|l| Arc::clone(*l) as Arc<dyn LimitListener>)
            .collect()
    }

    fn active(supplier: &Arc<CountingSupplier>) -> OutcomeDispatcher {
        OutcomeDispatcher::builder("orders-api", "aimd")
            .with_shared_context_supplier(supplier.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_rejects_blank_names() {
        assert_eq!(
            OutcomeDispatcher::builder("", "aimd").build().unwrap_err(),
            BuildError::EmptyOriginName
        );
        assert_eq!(
            OutcomeDispatcher::builder("api", "  ").build().unwrap_err(),
            BuildError::EmptyAlgorithmType
        );
    }

    #[test]
    fn test_builder_defaults_to_inactive() {
        let dispatcher = OutcomeDispatcher::builder("api", "fixed").build().unwrap();
        assert!(!dispatcher.is_active());
        assert_eq!(dispatcher.origin_name(), "api");
        assert_eq!(dispatcher.algorithm_type(), "fixed");
    }

    #[test]
    fn test_binding_count_matches_listeners_in_order() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let a = Arc::new(RecordingListener::new("a").returning("ctx-a"));
        let b = Arc::new(RecordingListener::new("b"));
        let c = Arc::new(RecordingListener::new("c").returning("ctx-c"));

        let decision = dispatcher
            .dispatch_accepted(&listeners(&[&a, &b, &c]), &CountingToken::new())
            .unwrap()
            .unwrap();

        let names: Vec<&str> = decision
            .bindings()
            .iter()
            .map(|b| b.listener().name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(decision.bindings()[0].context().is_some());
        assert!(decision.bindings()[1].context().is_none());
        assert!(decision.bindings()[2].context().is_some());
    }

    #[test]
    fn test_inactive_dispatch_is_a_no_op() {
        let dispatcher = OutcomeDispatcher::builder("api", "fixed").build().unwrap();
        let listener = Arc::new(RecordingListener::new("a").returning("ctx"));
        let token = OutcomeToken::new(CountingToken::new());
        let list = listeners(&[&listener]);

        assert!(dispatcher.dispatch_accepted(&list, &token).unwrap().is_none());
        assert!(dispatcher
            .dispatch_deferred_accepted(&list, &token, 1, 2)
            .unwrap()
            .is_none());
        assert!(dispatcher.dispatch_rejected(&list).unwrap().is_none());
        assert!(dispatcher
            .dispatch_deferred_rejected(&list, 1, 2)
            .unwrap()
            .is_none());

        assert!(listener.calls().is_empty());
        assert!(token.outcome().is_none());
        assert_eq!(dispatcher.metrics().dispatches_skipped(), 4);
    }

    #[test]
    fn test_accept_attaches_same_decision_to_token() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let token = OutcomeToken::new(CountingToken::new());

        let decision = dispatcher.dispatch_accepted(&[], &token).unwrap().unwrap();

        assert!(Arc::ptr_eq(&decision, token.outcome().unwrap()));
        assert_eq!(token.inner().releases(), 0);
    }

    #[test]
    fn test_registers_present_contexts_once_per_dispatch() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let a = Arc::new(RecordingListener::new("a").returning("ctx-a"));
        let b = Arc::new(RecordingListener::new("b"));
        let c = Arc::new(RecordingListener::new("c").returning("ctx-c"));

        dispatcher
            .dispatch_accepted(&listeners(&[&a, &b, &c]), &CountingToken::new())
            .unwrap();

        assert_eq!(supplier.calls(), 1);
        let registered: Vec<String> = supplier
            .carrier()
            .contexts()
            .iter()
            .filter_map(|c| c.downcast_ref::<String>().cloned())
            .collect();
        assert_eq!(registered, vec!["ctx-a", "ctx-c"]);
        assert_eq!(dispatcher.metrics().contexts_registered(), 2);
    }

    #[test]
    fn test_registered_context_is_the_bound_context() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let a = Arc::new(RecordingListener::new("a").returning("ctx-a"));

        let decision = dispatcher
            .dispatch_accepted(&listeners(&[&a]), &CountingToken::new())
            .unwrap()
            .unwrap();

        let bound = decision.bindings()[0].context().unwrap();
        assert!(bound.ptr_eq(&supplier.carrier().contexts()[0]));
    }

    #[test]
    fn test_deferred_accept_carries_timing() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let listener = Arc::new(RecordingListener::new("a"));

        let decision = dispatcher
            .dispatch_deferred_accepted(&listeners(&[&listener]), &CountingToken::new(), 1_000, 5_000)
            .unwrap()
            .unwrap();

        let timing = decision.wait_timing().unwrap();
        assert_eq!((timing.wait_start(), timing.wait_end()), (1_000, 5_000));
        assert_eq!(
            listener.calls(),
            vec![ListenerCall::Accept {
                shape: DecisionShape::DeferredAccept
            }]
        );
    }

    #[test]
    fn test_reject_uses_on_reject_and_never_touches_tokens() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let listener = Arc::new(RecordingListener::new("a"));

        let decision = dispatcher
            .dispatch_deferred_rejected(&listeners(&[&listener]), 10, 20)
            .unwrap()
            .unwrap();

        assert_eq!(decision.disposition(), Disposition::Rejected);
        assert_eq!(decision.bindings().len(), 1);
        assert_eq!(
            listener.calls(),
            vec![ListenerCall::Reject {
                shape: DecisionShape::DeferredReject
            }]
        );
        assert_eq!(supplier.calls(), 1);
        assert!(supplier.carrier().is_empty());
        assert_eq!(dispatcher.metrics().decisions_rejected(), 1);
    }

    #[test]
    fn test_accept_failure_aborts_remaining_listeners() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let log = CallLog::new();
        let first = Arc::new(RecordingListener::new("first").returning("ctx").with_log(&log));
        let broken = Arc::new(
            RecordingListener::new("broken")
                .failing_on(ListenerPhase::Accept)
                .with_log(&log),
        );
        let last = Arc::new(RecordingListener::new("last").with_log(&log));
        let token = OutcomeToken::new(CountingToken::new());

        let err = dispatcher
            .dispatch_accepted(&listeners(&[&first, &broken, &last]), &token)
            .unwrap_err();

        assert!(matches!(
            err,
            OutcomeError::Listener { ref listener, phase: ListenerPhase::Accept, .. } if listener == "broken"
        ));
        assert_eq!(log.names(), vec!["first", "broken"]);
        assert!(token.outcome().is_none());
        assert_eq!(supplier.calls(), 0);
        assert_eq!(dispatcher.metrics().decisions_accepted(), 0);
    }

    #[test]
    fn test_reject_failure_propagates() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let broken = Arc::new(RecordingListener::new("broken").failing_on(ListenerPhase::Reject));

        let err = dispatcher
            .dispatch_rejected(&listeners(&[&broken]))
            .unwrap_err();

        assert!(matches!(
            err,
            OutcomeError::Listener {
                phase: ListenerPhase::Reject,
                ..
            }
        ));
    }

    #[test]
    fn test_disabled_listeners_are_still_called() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let disabled = Arc::new(RecordingListener::new("off").disabled());

        dispatcher
            .dispatch_rejected(&listeners(&[&disabled]))
            .unwrap();

        assert_eq!(disabled.calls().len(), 1);
    }

    #[test]
    fn test_finish_through_dispatched_decision() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let a = Arc::new(RecordingListener::new("a").returning("ctx-a"));
        let b = Arc::new(RecordingListener::new("b").returning("ctx-b"));
        let result = ExecutionResult::success(Duration::from_millis(2));

        let decision = dispatcher
            .dispatch_accepted(&listeners(&[&a, &b]), &CountingToken::new())
            .unwrap()
            .unwrap();
        decision.finish(result.clone()).unwrap();

        assert_eq!(a.finished_with(), vec![(Some("ctx-a".to_string()), result.clone())]);
        assert_eq!(b.finished_with(), vec![(Some("ctx-b".to_string()), result)]);
    }

    #[test]
    fn test_plain_carrier_supplier() {
        let carrier = Arc::new(ContextCarrier::new());
        let dispatcher = OutcomeDispatcher::builder("api", "fixed")
            .with_context_supplier(ContextCarrier::supplier(&carrier))
            .build()
            .unwrap();
        let a = Arc::new(RecordingListener::new("a").returning("ctx"));

        dispatcher
            .dispatch_rejected(&listeners(&[&a]))
            .unwrap();

        assert_eq!(carrier.len(), 1);
    }

    #[test]
    fn test_concurrent_dispatch_from_many_threads() {
        let supplier = Arc::new(CountingSupplier::new());
        let dispatcher = active(&supplier);
        let a = Arc::new(RecordingListener::new("a").returning("ctx-a"));
        let b = Arc::new(RecordingListener::new("b"));
        let list = listeners(&[&a, &b]);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let dispatcher = &dispatcher;
                let list = &list;
                scope.spawn(move || {
                    for _ in 0..25 {
                        if worker % 2 == 0 {
                            let token = OutcomeToken::new(CountingToken::new());
                            let decision = dispatcher
                                .dispatch_accepted(list, &token)
                                .unwrap()
                                .unwrap();
                            assert_eq!(decision.bindings().len(), 2);
                            assert!(Arc::ptr_eq(&decision, token.outcome().unwrap()));
                        } else {
                            let decision = dispatcher.dispatch_rejected(list).unwrap().unwrap();
                            assert_eq!(decision.bindings().len(), 2);
                        }
                    }
                });
            }
        });

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.decisions_accepted, 100);
        assert_eq!(snapshot.decisions_rejected, 100);
        assert_eq!(snapshot.contexts_registered, 200);
        assert_eq!(supplier.calls(), 200);
        assert_eq!(supplier.carrier().len(), 200);
        assert_eq!(a.calls().len(), 200);
        assert_eq!(b.calls().len(), 200);
    }

    #[test]
    fn test_dispatchers_share_metrics() {
        let supplier = Arc::new(CountingSupplier::new());
        let metrics = DispatchMetrics::new();
        let reads = OutcomeDispatcher::builder("reads", "vegas")
            .with_shared_context_supplier(supplier.clone())
            .with_metrics(metrics.clone())
            .build()
            .unwrap();
        let writes = OutcomeDispatcher::builder("writes", "vegas")
            .with_metrics(metrics.clone())
            .build()
            .unwrap();

        reads.dispatch_accepted(&[], &CountingToken::new()).unwrap();
        reads.dispatch_rejected(&[]).unwrap();
        writes.dispatch_rejected(&[]).unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions_accepted, 1);
        assert_eq!(snapshot.decisions_rejected, 1);
        assert_eq!(snapshot.dispatches_skipped, 1);
        assert_eq!(writes.metrics().snapshot(), snapshot);
    }
}
