//! Mock implementations for testing.
//!
//! This module provides test doubles for the ports and for listeners,
//! enabling controlled testing of dispatch and finish behavior.

pub mod clock;
pub mod context;
pub mod layer;
pub mod listener;
pub mod token;

pub use clock::MockClock;
pub use context::CountingSupplier;
pub use layer::{CapturedEvent, CapturedSpan, MockCaptureLayer, NamedValue};
pub use listener::{CallLog, ListenerCall, RecordingListener};
pub use token::CountingToken;
