//! Token adapters.
//!
//! `OutcomeToken` gives any limiter token the outcome-aware capability: the
//! dispatcher attaches the accepted decision to it, and whoever completes the
//! token later drives the decision's finish phase through it.

use crate::application::ports::{LimitToken, OutcomeAware};
use crate::domain::execution::ExecutionResult;
use crate::domain::outcome::{AcceptedDecision, LimitDecision, OutcomeError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Token with nothing to release.
///
/// Useful for limiters that track capacity elsewhere and only need a token to
/// carry the accepted decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopToken;

impl LimitToken for NoopToken {
    fn release(&self) {}
}

/// Outcome-aware wrapper around a limiter token.
///
/// The first attached decision is kept; a token is issued for one acceptance,
/// so a second attachment is logged and ignored. The inner token is released
/// at most once, however often the wrapper is released or completed.
///
/// # Example
///
/// ```
/// use limit_outcome::{ExecutionResult, LimitToken, NoopToken, OutcomeToken};
///
/// let token = OutcomeToken::new(NoopToken);
/// assert!(token.as_outcome_aware().is_some());
/// assert!(token.outcome().is_none());
///
/// // Nothing attached: completing only releases the inner token.
/// token.complete(ExecutionResult::Ignored).unwrap();
/// ```
pub struct OutcomeToken<T: LimitToken> {
    inner: T,
    outcome: OnceLock<Arc<AcceptedDecision>>,
    released: AtomicBool,
}

impl<T: LimitToken> OutcomeToken<T> {
    /// Wrap a limiter token.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            outcome: OnceLock::new(),
            released: AtomicBool::new(false),
        }
    }

    /// The wrapped token.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The decision attached during dispatch, if any.
    pub fn outcome(&self) -> Option<&Arc<AcceptedDecision>> {
        self.outcome.get()
    }

    /// Check if the inner token has been released.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Release the slot, then finish the attached decision with `result`.
    ///
    /// The slot is released first so a failing listener cannot leak capacity.
    /// Completing again re-runs the finish phase but does not release again.
    ///
    /// # Errors
    /// Returns the error from [`AcceptedDecision::finish`].
    pub fn complete(&self, result: ExecutionResult) -> Result<(), OutcomeError> {
        self.release_once();
        match self.outcome.get() {
            Some(decision) => decision.finish(result),
            None => Ok(()),
        }
    }

    fn release_once(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            tracing::debug!("token already released; skipping inner release");
            return;
        }
        self.inner.release();
    }
}

impl<T: LimitToken> LimitToken for OutcomeToken<T> {
    fn release(&self) {
        self.release_once();
    }

    fn as_outcome_aware(&self) -> Option<&dyn OutcomeAware> {
        Some(self)
    }
}

impl<T: LimitToken> OutcomeAware for OutcomeToken<T> {
    fn attach_outcome(&self, decision: Arc<AcceptedDecision>) {
        if let Err(rejected) = self.outcome.set(decision) {
            tracing::warn!(
                origin = %rejected.origin_name(),
                algorithm = %rejected.algorithm_type(),
                "token already carries an accepted decision; ignoring the new one"
            );
        }
    }
}

impl<T: LimitToken + fmt::Debug> fmt::Debug for OutcomeToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeToken")
            .field("inner", &self.inner)
            .field("attached", &self.outcome.get().is_some())
            .field("released", &self.is_released())
            .finish()
    }
}
