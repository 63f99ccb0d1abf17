//! Decisions after dispatch: the decision attributes plus one binding per
//! listener, and for accepted decisions the finish phase.

use crate::domain::decision::{AcceptedView, Decision, DecisionShape, Disposition, WaitTiming};
use crate::domain::execution::ExecutionResult;
use crate::domain::listener::{LimitListener, ListenerContext, ListenerError};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Which listener hook was running when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    /// `on_accept`
    Accept,
    /// `on_reject`
    Reject,
    /// `on_finish`
    Finish,
}

impl fmt::Display for ListenerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerPhase::Accept => f.write_str("accept"),
            ListenerPhase::Reject => f.write_str("reject"),
            ListenerPhase::Finish => f.write_str("finish"),
        }
    }
}

/// Errors surfaced by dispatch and by the finish phase.
#[derive(Debug)]
pub enum OutcomeError {
    /// The execution result was read before the decision was finished.
    ///
    /// This is a bug in the caller, not a runtime condition to recover from.
    ResultNotSet,
    /// A listener hook failed; listeners after it were not notified.
    Listener {
        /// Name of the failing listener
        listener: String,
        /// Hook that failed
        phase: ListenerPhase,
        /// Error returned by the listener
        source: ListenerError,
    },
}

impl OutcomeError {
    pub(crate) fn listener(listener: &str, phase: ListenerPhase, source: ListenerError) -> Self {
        OutcomeError::Listener {
            listener: listener.to_string(),
            phase,
            source,
        }
    }
}

impl fmt::Display for OutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeError::ResultNotSet => {
                write!(f, "execution result read before the decision was finished")
            }
            OutcomeError::Listener {
                listener,
                phase,
                source,
            } => write!(f, "listener '{}' failed on {}: {}", listener, phase, source),
        }
    }
}

impl Error for OutcomeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OutcomeError::ResultNotSet => None,
            OutcomeError::Listener { source, .. } => Some(source),
        }
    }
}

/// A listener paired with the context it returned during dispatch.
#[derive(Clone)]
pub struct ListenerBinding {
    listener: Arc<dyn LimitListener>,
    context: Option<ListenerContext>,
}

impl ListenerBinding {
    pub(crate) fn new(listener: Arc<dyn LimitListener>, context: Option<ListenerContext>) -> Self {
        Self { listener, context }
    }

    /// The bound listener.
    pub fn listener(&self) -> &Arc<dyn LimitListener> {
        &self.listener
    }

    /// The context the listener returned, if any.
    pub fn context(&self) -> Option<&ListenerContext> {
        self.context.as_ref()
    }
}

impl fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("listener", &self.listener.name())
            .field("context", &self.context)
            .finish()
    }
}

/// Read access common to accepted and rejected decisions.
pub trait LimitDecision {
    /// Decision attributes.
    fn decision(&self) -> &Decision;

    /// One binding per listener passed to dispatch, in the same order.
    fn bindings(&self) -> &[ListenerBinding];

    /// Name of the limiter instance that produced this decision.
    fn origin_name(&self) -> &str {
        self.decision().origin_name()
    }

    /// Identity of the limiting algorithm in effect.
    fn algorithm_type(&self) -> &str {
        self.decision().algorithm_type()
    }

    /// Whether the work was accepted or rejected.
    fn disposition(&self) -> Disposition {
        self.decision().disposition()
    }

    /// Wait bounds, present only on deferred decisions.
    fn wait_timing(&self) -> Option<WaitTiming> {
        self.decision().wait_timing()
    }

    /// Which construction path produced this decision.
    fn shape(&self) -> DecisionShape {
        self.decision().shape()
    }
}

/// A rejected decision. Complete as soon as dispatch returns.
#[derive(Debug, Clone)]
pub struct RejectedDecision {
    decision: Decision,
    bindings: Vec<ListenerBinding>,
}

impl RejectedDecision {
    pub(crate) fn new(decision: Decision, bindings: Vec<ListenerBinding>) -> Self {
        debug_assert!(decision.disposition().is_rejected());
        Self { decision, bindings }
    }
}

impl LimitDecision for RejectedDecision {
    fn decision(&self) -> &Decision {
        &self.decision
    }

    fn bindings(&self) -> &[ListenerBinding] {
        &self.bindings
    }
}

/// An accepted decision awaiting the outcome of the work it admitted.
///
/// Built complete by the dispatcher and shared through `Arc`: the same
/// allocation is attached to an outcome-aware token and returned to the caller,
/// so the finish phase may run on a different thread than dispatch. Bindings
/// never change after construction and the execution result is written at most
/// once.
#[derive(Debug)]
pub struct AcceptedDecision {
    decision: Decision,
    bindings: Vec<ListenerBinding>,
    result: OnceLock<ExecutionResult>,
}

impl AcceptedDecision {
    pub(crate) fn new(decision: Decision, bindings: Vec<ListenerBinding>) -> Self {
        debug_assert!(decision.disposition().is_accepted());
        Self {
            decision,
            bindings,
            result: OnceLock::new(),
        }
    }

    /// The decision presented as an accepted view.
    pub fn view(&self) -> AcceptedView<'_> {
        AcceptedView::new(&self.decision)
    }

    /// Report how the admitted work concluded.
    ///
    /// Stores the result, then calls `on_finish` on every bound listener in
    /// binding order, each with the context it returned from `on_accept`.
    ///
    /// Finish is expected exactly once. Calling it again notifies every listener
    /// again with the new result, while [`execution_result`](Self::execution_result)
    /// keeps returning the first one.
    ///
    /// # Errors
    /// Returns `OutcomeError::Listener` from the first failing listener; the
    /// listeners after it are not notified. The result is stored regardless.
    pub fn finish(&self, result: ExecutionResult) -> Result<(), OutcomeError> {
        if self.result.set(result.clone()).is_err() {
            tracing::warn!(
                origin = %self.decision.origin_name(),
                algorithm = %self.decision.algorithm_type(),
                outcome = result.kind(),
                "accepted decision finished more than once; notifying listeners again"
            );
        }

        tracing::debug!(
            origin = %self.decision.origin_name(),
            algorithm = %self.decision.algorithm_type(),
            outcome = result.kind(),
            listeners = self.bindings.len(),
            "finishing accepted decision"
        );

        for binding in &self.bindings {
            binding
                .listener
                .on_finish(binding.context.as_ref(), &result)
                .map_err(|source| {
                    OutcomeError::listener(binding.listener.name(), ListenerPhase::Finish, source)
                })?;
        }

        Ok(())
    }

    /// The result passed to the first [`finish`](Self::finish) call.
    ///
    /// # Errors
    /// Returns `OutcomeError::ResultNotSet` if the decision has not been finished.
    pub fn execution_result(&self) -> Result<&ExecutionResult, OutcomeError> {
        self.result.get().ok_or(OutcomeError::ResultNotSet)
    }

    /// Check if the decision has been finished.
    pub fn is_finished(&self) -> bool {
        self.result.get().is_some()
    }
}

impl LimitDecision for AcceptedDecision {
    fn decision(&self) -> &Decision {
        &self.decision
    }

    fn bindings(&self) -> &[ListenerBinding] {
        &self.bindings
    }
}
