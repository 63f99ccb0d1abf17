//! Basic walkthrough: accept, finish and reject with the tracing listener.
//!
//! Run with: cargo run --example basic

use limit_outcome::{
    AdmissionSpan, ContextCarrier, ExecutionResult, ListenerRegistry, NoopToken,
    OutcomeDispatcher, OutcomeToken, TracingListener,
};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let registry = ListenerRegistry::new();
    registry.register(Arc::new(TracingListener::new()));

    let carrier = Arc::new(ContextCarrier::new());
    let dispatcher = OutcomeDispatcher::builder("checkout", "fixed")
        .with_context_supplier(ContextCarrier::supplier(&carrier))
        .build()
        .expect("valid dispatcher configuration");

    println!("Accepting one request...");
    let token = OutcomeToken::new(NoopToken);
    dispatcher
        .dispatch_accepted(&registry.enabled_listeners(), &token)
        .expect("listeners accept");

    if let Some(admission) = carrier.find::<AdmissionSpan>() {
        admission.span().in_scope(|| {
            tracing::info!(order_id = 42, "charging card");
        });
    }

    token
        .complete(ExecutionResult::success(Duration::from_millis(18)))
        .expect("listeners finish");

    println!("\nRejecting the next request after a short wait...");
    dispatcher
        .dispatch_deferred_rejected(&registry.enabled_listeners(), 1_000, 251_000)
        .expect("listeners reject");

    let snapshot = dispatcher.metrics().snapshot();
    println!(
        "\nDispatched {} decisions ({} accepted, {} rejected), {} contexts registered",
        snapshot.total_dispatched(),
        snapshot.decisions_accepted,
        snapshot.decisions_rejected,
        snapshot.contexts_registered
    );
}
