//! Publication sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::PublishEvent;

/// Trait for receiving publish events.
///
/// Implementations forward events to the host platform's entity layer.
///
/// # Design Rules
///
/// - `emit()` must be fast and non-blocking (no network calls, no disk writes)
/// - Implementations should queue events for async processing
/// - Failure to deliver must not affect the polling engine (best-effort)
pub trait PublishSink: Send + Sync {
    /// Emit a single publish event.
    fn emit(&self, event: PublishEvent);
}

/// No-op implementation for tests or contexts that don't need publication.
#[derive(Clone, Default)]
pub struct NoOpPublishSink;

impl PublishSink for NoOpPublishSink {
    fn emit(&self, _event: PublishEvent) {
        // Intentionally empty - events are discarded
    }
}

/// Mock sink for testing - collects emitted events.
#[derive(Clone, Default)]
pub struct MockPublishSink {
    events: Arc<Mutex<Vec<PublishEvent>>>,
}

impl MockPublishSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<PublishEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the most recently collected event.
    pub fn last(&self) -> Option<PublishEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    /// Clears collected events.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Returns the number of collected events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Returns true if no events have been collected.
    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl PublishSink for MockPublishSink {
    fn emit(&self, event: PublishEvent) {
        self.events.lock().unwrap().push(event);
    }
}
