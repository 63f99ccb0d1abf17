//! Admission decisions produced by a limiter.
//!
//! A decision records which limiter produced it, which limiting algorithm was in
//! effect, whether the unit of work was accepted or rejected, and (for deferred
//! decisions) how long the request waited before the limiter made up its mind.
//!
//! Decisions are only built by the dispatcher, through one of four paths:
//! immediate-accept, immediate-reject, deferred-accept and deferred-reject.
//! Disposition and timing are fixed at construction and never change.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// Whether the limiter admitted the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The work was admitted and holds capacity until it finishes
    Accepted,
    /// The work was turned away
    Rejected,
}

impl Disposition {
    /// Check if this disposition is `Accepted`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Disposition::Accepted)
    }

    /// Check if this disposition is `Rejected`.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Disposition::Rejected)
    }

    /// Lowercase label, suitable for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Accepted => "accepted",
            Disposition::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wait bounds of a deferred decision, in nanoseconds.
///
/// The timestamps come from the limiter's own clock; this crate only carries
/// them and never interprets their origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitTiming {
    wait_start: u64,
    wait_end: u64,
}

impl WaitTiming {
    /// Create wait bounds from start and end timestamps.
    pub fn new(wait_start: u64, wait_end: u64) -> Self {
        Self {
            wait_start,
            wait_end,
        }
    }

    /// When the request started waiting.
    pub fn wait_start(&self) -> u64 {
        self.wait_start
    }

    /// When the limiter reached its decision.
    pub fn wait_end(&self) -> u64 {
        self.wait_end
    }

    /// Nanoseconds spent waiting. Zero if the clock went backwards.
    pub fn waited_nanos(&self) -> u64 {
        self.wait_end.saturating_sub(self.wait_start)
    }

    /// Time spent waiting.
    pub fn waited(&self) -> Duration {
        Duration::from_nanos(self.waited_nanos())
    }
}

/// The four ways a decision can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionShape {
    /// Accepted without waiting
    ImmediateAccept,
    /// Rejected without waiting
    ImmediateReject,
    /// Accepted after waiting in the limiter
    DeferredAccept,
    /// Rejected after waiting in the limiter
    DeferredReject,
}

impl DecisionShape {
    /// Lowercase label, suitable for structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionShape::ImmediateAccept => "immediate_accept",
            DecisionShape::ImmediateReject => "immediate_reject",
            DecisionShape::DeferredAccept => "deferred_accept",
            DecisionShape::DeferredReject => "deferred_reject",
        }
    }
}

impl fmt::Display for DecisionShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes shared by every decision.
///
/// This is the view handed to [`LimitListener::on_reject`](crate::LimitListener::on_reject).
/// Accepted decisions are presented through [`AcceptedView`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    origin_name: Arc<str>,
    algorithm_type: Arc<str>,
    disposition: Disposition,
    timing: Option<WaitTiming>,
}

impl Decision {
    fn new(
        origin_name: Arc<str>,
        algorithm_type: Arc<str>,
        disposition: Disposition,
        timing: Option<WaitTiming>,
    ) -> Self {
        Self {
            origin_name,
            algorithm_type,
            disposition,
            timing,
        }
    }

    pub(crate) fn immediate_accepted(origin_name: Arc<str>, algorithm_type: Arc<str>) -> Self {
        Self::new(origin_name, algorithm_type, Disposition::Accepted, None)
    }

    pub(crate) fn immediate_rejected(origin_name: Arc<str>, algorithm_type: Arc<str>) -> Self {
        Self::new(origin_name, algorithm_type, Disposition::Rejected, None)
    }

    pub(crate) fn deferred_accepted(
        origin_name: Arc<str>,
        algorithm_type: Arc<str>,
        timing: WaitTiming,
    ) -> Self {
        Self::new(
            origin_name,
            algorithm_type,
            Disposition::Accepted,
            Some(timing),
        )
    }

    pub(crate) fn deferred_rejected(
        origin_name: Arc<str>,
        algorithm_type: Arc<str>,
        timing: WaitTiming,
    ) -> Self {
        Self::new(
            origin_name,
            algorithm_type,
            Disposition::Rejected,
            Some(timing),
        )
    }

    /// Name of the limiter instance that produced this decision.
    pub fn origin_name(&self) -> &str {
        &self.origin_name
    }

    /// Identity of the limiting algorithm in effect.
    pub fn algorithm_type(&self) -> &str {
        &self.algorithm_type
    }

    /// Whether the work was accepted or rejected.
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Wait bounds, present only on deferred decisions.
    pub fn wait_timing(&self) -> Option<WaitTiming> {
        self.timing
    }

    /// Check if the decision was reached after waiting.
    pub fn is_deferred(&self) -> bool {
        self.timing.is_some()
    }

    /// Which of the four construction paths produced this decision.
    pub fn shape(&self) -> DecisionShape {
        match (self.disposition, self.timing.is_some()) {
            (Disposition::Accepted, false) => DecisionShape::ImmediateAccept,
            (Disposition::Rejected, false) => DecisionShape::ImmediateReject,
            (Disposition::Accepted, true) => DecisionShape::DeferredAccept,
            (Disposition::Rejected, true) => DecisionShape::DeferredReject,
        }
    }
}

/// View of a decision that is known to be accepted.
///
/// Only the dispatcher can create one, so a listener's accept hook can never be
/// handed a rejected decision.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedView<'a> {
    decision: &'a Decision,
}

impl<'a> AcceptedView<'a> {
    pub(crate) fn new(decision: &'a Decision) -> Self {
        debug_assert!(decision.disposition().is_accepted());
        Self { decision }
    }

    /// The underlying decision attributes.
    pub fn decision(&self) -> &'a Decision {
        self.decision
    }
}

impl Deref for AcceptedView<'_> {
    type Target = Decision;

    fn deref(&self) -> &Decision {
        self.decision
    }
}
