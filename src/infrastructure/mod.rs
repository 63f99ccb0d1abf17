//! Infrastructure layer - adapters for the application ports.
//!
//! This layer provides:
//! - Clock abstraction (system time vs mock)
//! - An explicit-carrier propagation context
//! - Outcome-aware token wrappers
//! - A listener that reports decisions through `tracing`

pub mod clock;
pub mod context;
pub mod token;
pub mod tracing_listener;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for tokens,
/// suppliers, listeners and the clock, plus a capturing `tracing` layer.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// limit-outcome = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
