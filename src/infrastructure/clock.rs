//! Clock adapters.
//!
//! `SystemClock` reads the monotonic clock. Tests use `MockClock` from
//! `crate::infrastructure::mocks`, available with the `test-helpers` feature:
//!
//! ```toml
//! [dev-dependencies]
//! limit-outcome = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::Clock;
use std::time::Instant;

/// Clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let earlier = clock.now();
        let later = clock.now();
        assert!(later >= earlier);
    }
}
