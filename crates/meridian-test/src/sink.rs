//! Telemetry capture.

use std::sync::Arc;

use meridian_telemetry::{EventName, TelemetryEmitter, TelemetryError, TelemetryEvent, TelemetrySink};
use parking_lot::Mutex;

/// [`TelemetrySink`] that keeps every event in memory.
///
/// ```
/// use meridian_telemetry::{EventName, Exchange};
/// use meridian_test::RecordingSink;
///
/// let sink = RecordingSink::new();
/// let emitter = sink.emitter("orders.clients");
///
/// emitter.client_request(&Exchange::new("census.get_customer", "census", "GET"), "http://census/");
/// assert_eq!(sink.count(EventName::ClientRequest), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(String, TelemetryEvent)>>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an emitter that reports to this sink under `logger`.
    #[must_use]
    pub fn emitter(&self, logger: impl Into<String>) -> TelemetryEmitter {
        TelemetryEmitter::with_sink(logger, Arc::new(self.clone()))
    }

    /// All recorded events, in order.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Recorded events with the given name, in order.
    #[must_use]
    pub fn events_named(&self, name: EventName) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.name == name)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Number of recorded events with the given name.
    #[must_use]
    pub fn count(&self, name: EventName) -> usize {
        self.events.lock().iter().filter(|(_, e)| e.name == name).count()
    }

    /// Names of all recorded events, in order.
    #[must_use]
    pub fn names(&self) -> Vec<EventName> {
        self.events.lock().iter().map(|(_, e)| e.name).collect()
    }

    /// Logger names events were recorded under, in order.
    #[must_use]
    pub fn loggers(&self) -> Vec<String> {
        self.events.lock().iter().map(|(l, _)| l.clone()).collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Forgets all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, logger: &str, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.events.lock().push((logger.to_string(), event.clone()));
        Ok(())
    }
}
