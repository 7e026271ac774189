//! Capturing `tracing` layer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::Layer;

/// Layer that records every event it sees, fields included.
///
/// ```
/// use arithmetic_service::infrastructure::mocks::MockCaptureLayer;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let capture = MockCaptureLayer::new();
/// let subscriber = tracing_subscriber::registry().with(capture.clone());
///
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(operation = "add", a = 2, "call completed");
/// });
///
/// let events = capture.get_captured();
/// assert_eq!(events[0].field("operation"), Some("add"));
/// assert_eq!(events[0].field("a"), Some("2"));
/// assert_eq!(events[0].message, "call completed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCaptureLayer {
    captured: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// One captured event. Field values are stored as their display text; debug
/// formatted fields use their `Debug` text.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Value of a named field, excluding the message.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl MockCaptureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events captured so far, oldest first.
    pub fn get_captured(&self) -> Vec<CapturedEvent> {
        self.events().clone()
    }

    /// Captured events with the given target.
    pub fn with_target(&self, target: &str) -> Vec<CapturedEvent> {
        self.events()
            .iter()
            .filter(|event| event.target == target)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events().len()
    }

    pub fn clear(&self) {
        self.events().clear();
    }

    fn events(&self) -> MutexGuard<'_, Vec<CapturedEvent>> {
        self.captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Layer<S> for MockCaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.events().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn store(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.store(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.store(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.store(field, value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_captures_level_target_and_fields() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "calc", result = %7, ok = true, took = ?std::time::Duration::from_millis(3), "done");
            tracing::info!("plain");
        });

        assert_eq!(capture.count(), 2);
        let events = capture.get_captured();
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].target, "calc");
        assert_eq!(events[0].message, "done");
        assert_eq!(events[0].field("result"), Some("7"));
        assert_eq!(events[0].field("ok"), Some("true"));
        assert_eq!(events[0].field("took"), Some("3ms"));
        assert_eq!(capture.with_target("calc").len(), 1);

        capture.clear();
        assert_eq!(capture.count(), 0);
    }
}
