//! Domain layer - pure types with no infrastructure dependencies.
//!
//! This layer contains the core concepts of the outcome-notification protocol:
//! - Decisions and their four shapes
//! - Execution results
//! - The listener contract and listener contexts
//! - Dispatched decisions, their bindings and the finish phase

pub mod decision;
pub mod execution;
pub mod listener;
pub mod outcome;
