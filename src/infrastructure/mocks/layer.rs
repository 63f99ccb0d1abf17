//! Mock tracing layer for testing.
//!
//! Captures events together with their fields and enclosing span, and keeps
//! the fields recorded on every span so tests can assert on late `record`
//! calls as well as on creation-time values.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// A field name and its rendered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

impl NamedValue {
    /// Create a field/value pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Captured event information.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<NamedValue>,
    /// Name of the span the event belongs to, if any.
    pub span: Option<String>,
}

/// Captured span information.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedSpan {
    pub name: String,
    /// Every recorded value, in recording order.
    pub fields: Vec<NamedValue>,
}

impl CapturedSpan {
    /// The last value recorded for `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Default)]
struct Captured {
    events: Vec<CapturedEvent>,
    spans: Vec<(Id, CapturedSpan)>,
}

/// Mock layer that captures events and spans for testing.
#[derive(Clone, Default)]
pub struct MockCaptureLayer {
    captured: Arc<Mutex<Captured>>,
}

impl MockCaptureLayer {
    /// Create a new mock capture layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured events.
    pub fn get_captured(&self) -> Vec<CapturedEvent> {
        self.lock().events.clone()
    }

    /// Get the events whose target starts with `target`.
    pub fn events_for(&self, target: &str) -> Vec<CapturedEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.target.starts_with(target))
            .cloned()
            .collect()
    }

    /// Get all spans opened so far, in creation order.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.lock().spans.iter().map(|(_, s)| s.clone()).collect()
    }

    /// Get the count of captured events.
    pub fn count(&self) -> usize {
        self.lock().events.len()
    }

    /// Clear all captured events and spans.
    ///
    /// # Examples
    ///
    /// ```
    /// use limit_outcome::infrastructure::mocks::MockCaptureLayer;
    /// use tracing::info;
    /// use tracing_subscriber::layer::SubscriberExt;
    ///
    /// let capture = MockCaptureLayer::new();
    /// let subscriber = tracing_subscriber::registry().with(capture.clone());
    ///
    /// tracing::subscriber::with_default(subscriber, || {
    ///     info!("test message");
    ///     assert_eq!(capture.count(), 1);
    ///
    ///     capture.clear();
    ///     assert_eq!(capture.count(), 0);
    /// });
    /// ```
    pub fn clear(&self) {
        let mut captured = self.lock();
        captured.events.clear();
        captured.spans.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.captured.lock().expect(
            "MockCaptureLayer mutex poisoned - a test thread panicked while holding the lock",
        )
    }
}

impl<S> Layer<S> for MockCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        self.lock().spans.push((
            id.clone(),
            CapturedSpan {
                name: attrs.metadata().name().to_string(),
                fields: visitor.fields,
            },
        ));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut captured = self.lock();
        if let Some((_, span)) = captured.spans.iter_mut().rev().find(|(i, _)| i == id) {
            span.fields.extend(visitor.fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let span = ctx.event_span(event).map(|s| s.name().to_string());
        self.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
            span,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<NamedValue>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push(NamedValue::new(field.name(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}
