//! How an admitted unit of work concluded.

use std::fmt;
use std::time::Duration;

/// Result of running the work protected by an accepted decision.
///
/// Supplied by the caller when the work completes and handed, unchanged, to
/// every listener that observed the acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The work completed normally
    Success {
        /// Time the work held its admission slot
        latency: Duration,
    },
    /// The work failed
    Failure {
        /// Time the work held its admission slot
        latency: Duration,
        /// Human-readable cause
        cause: String,
    },
    /// The work was abandoned because the protected resource was overloaded
    /// (timeouts, upstream rejections)
    Dropped {
        /// Time the work held its admission slot
        latency: Duration,
    },
    /// The outcome should not be counted toward the limit
    Ignored,
}

impl ExecutionResult {
    /// Create a success result.
    pub fn success(latency: Duration) -> Self {
        ExecutionResult::Success { latency }
    }

    /// Create a failure result.
    pub fn failure(latency: Duration, cause: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            latency,
            cause: cause.into(),
        }
    }

    /// Create a dropped result.
    pub fn dropped(latency: Duration) -> Self {
        ExecutionResult::Dropped { latency }
    }

    /// Check if the work succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Time the work held its slot, if measured.
    pub fn latency(&self) -> Option<Duration> {
        match self {
            ExecutionResult::Success { latency }
            | ExecutionResult::Failure { latency, .. }
            | ExecutionResult::Dropped { latency } => Some(*latency),
            ExecutionResult::Ignored => None,
        }
    }

    /// Lowercase label, suitable for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionResult::Success { .. } => "success",
            ExecutionResult::Failure { .. } => "failure",
            ExecutionResult::Dropped { .. } => "dropped",
            ExecutionResult::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Failure { latency, cause } => {
                write!(f, "failure after {:?}: {}", latency, cause)
            }
            ExecutionResult::Ignored => f.write_str("ignored"),
            other => match other.latency() {
                Some(latency) => write!(f, "{} after {:?}", other.kind(), latency),
                None => f.write_str(other.kind()),
            },
        }
    }
}
