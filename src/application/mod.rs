//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates listeners around a limiter's decisions:
//! - Dispatcher (fan-out, token binding, context registration)
//! - Listener registry (assembly of the listener list)
//! - Dispatch metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) for tokens, propagation
//! contexts and clocks. Infrastructure adapters and external code implement
//! them.

pub mod dispatcher;
pub mod metrics;
pub mod ports;
pub mod registry;
