//! Recording listener for testing dispatch order and payloads.

use crate::domain::decision::{AcceptedView, Decision, DecisionShape};
use crate::domain::execution::ExecutionResult;
use crate::domain::listener::{LimitListener, ListenerContext, ListenerError};
use crate::domain::outcome::ListenerPhase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One hook invocation seen by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerCall {
    /// `on_accept` was called
    Accept {
        /// Shape of the decision
        shape: DecisionShape,
    },
    /// `on_reject` was called
    Reject {
        /// Shape of the decision
        shape: DecisionShape,
    },
    /// `on_finish` was called
    Finish {
        /// The context passed back, if it held a `String`
        context: Option<String>,
        /// The result passed in
        result: ExecutionResult,
    },
}

/// Call log shared between listeners, to assert on ordering across them.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<(String, ListenerCall)>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, with the listener name.
    pub fn entries(&self) -> Vec<(String, ListenerCall)> {
        self.lock().clone()
    }

    /// Names of the listeners, in call order.
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    fn push(&self, name: &str, call: ListenerCall) {
        self.lock().push((name.to_string(), call));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, ListenerCall)>> {
        self.entries
            .lock()
            .expect("CallLog mutex poisoned - a test thread panicked while holding the lock")
    }
}

/// Listener that records every hook call.
///
/// Optionally returns a `String` context from accept/reject and fails on a
/// chosen phase (after recording the call).
#[derive(Debug)]
pub struct RecordingListener {
    name: String,
    enabled: AtomicBool,
    context: Option<String>,
    fail_on: Option<ListenerPhase>,
    log: CallLog,
    calls: Mutex<Vec<ListenerCall>>,
}

impl RecordingListener {
    /// Create an enabled listener that returns no context.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            context: None,
            fail_on: None,
            log: CallLog::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return `context` from `on_accept` and `on_reject`.
    pub fn returning(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    /// Report `enabled() == false`.
    pub fn disabled(self) -> Self {
        self.set_enabled(false);
        self
    }

    /// Fail with a `ListenerError` when `phase` runs.
    pub fn failing_on(mut self, phase: ListenerPhase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    /// Also record calls into a shared log.
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    /// Toggle `enabled()`.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Calls made on this listener, in order.
    pub fn calls(&self) -> Vec<ListenerCall> {
        self.lock().clone()
    }

    /// Number of `on_finish` calls.
    pub fn finish_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| matches!(c, ListenerCall::Finish { .. }))
            .count()
    }

    /// Context and result of each `on_finish` call.
    pub fn finished_with(&self) -> Vec<(Option<String>, ExecutionResult)> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                ListenerCall::Finish { context, result } => Some((context.clone(), result.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, phase: ListenerPhase, call: ListenerCall) -> Result<(), ListenerError> {
        self.lock().push(call.clone());
        self.log.push(&self.name, call);
        if self.fail_on == Some(phase) {
            return Err(ListenerError::new(format!("{} failed on {}", self.name, phase)));
        }
        Ok(())
    }

    fn context(&self) -> Option<ListenerContext> {
        self.context.clone().map(ListenerContext::new)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ListenerCall>> {
        self.calls.lock().expect(
            "RecordingListener mutex poisoned - a test thread panicked while holding the lock",
        )
    }
}

impl LimitListener for RecordingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn on_accept(
        &self,
        decision: AcceptedView<'_>,
    ) -> Result<Option<ListenerContext>, ListenerError> {
        self.record(
            ListenerPhase::Accept,
            ListenerCall::Accept {
                shape: decision.shape(),
            },
        )?;
        Ok(self.context())
    }

    fn on_reject(&self, decision: &Decision) -> Result<Option<ListenerContext>, ListenerError> {
        self.record(
            ListenerPhase::Reject,
            ListenerCall::Reject {
                shape: decision.shape(),
            },
        )?;
        Ok(self.context())
    }

    fn on_finish(
        &self,
        context: Option<&ListenerContext>,
        result: &ExecutionResult,
    ) -> Result<(), ListenerError> {
        self.record(
            ListenerPhase::Finish,
            ListenerCall::Finish {
                context: context.and_then(|c| c.downcast_ref::<String>().cloned()),
                result: result.clone(),
            },
        )
    }
}
