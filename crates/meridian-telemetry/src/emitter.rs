//! Telemetry emission.
//!
//! [`TelemetryEmitter`] is the single entry point for reporting the six HTTP
//! events. It hands each event to a [`TelemetrySink`]; the default
//! [`TracingSink`] turns it into a `tracing` event which the structured JSON
//! formatter renders as a log record.
//!
//! Emission never fails from the caller's point of view. A sink error is
//! reported as a warning and otherwise dropped.
//!
//! # Example
//!
//! ```
//! use meridian_telemetry::{Exchange, TelemetryEmitter};
//!
//! let emitter = TelemetryEmitter::new("orders.clients");
//! let exchange = Exchange::new("census.get_customer", "census", "GET");
//!
//! emitter.client_request(&exchange, "http://census:8001/api/customers/123");
//! emitter.client_response(&exchange, 200, 14);
//! ```

use crate::error::TelemetryError;
use crate::events::{Exchange, TelemetryEvent};
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// `tracing` target used for telemetry events.
pub const TELEMETRY_TARGET: &str = "meridian::telemetry";

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Records one event on behalf of `logger`.
    fn record(&self, logger: &str, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Sink that logs events through `tracing`.
///
/// The log message is the event name; the encoded event is attached as the
/// `data` field and the logger name as the `logger` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, logger: &str, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let data = serde_json::to_string(event)?;
        let name = event.name.as_str();
        match event.level() {
            Level::ERROR => {
                tracing::error!(target: TELEMETRY_TARGET, logger, data = %data, "{name}");
            }
            Level::WARN => {
                tracing::warn!(target: TELEMETRY_TARGET, logger, data = %data, "{name}");
            }
            _ => {
                tracing::info!(target: TELEMETRY_TARGET, logger, data = %data, "{name}");
            }
        }
        Ok(())
    }
}

/// Emits the canonical HTTP telemetry events.
///
/// Cloning is cheap; clones share the sink.
#[derive(Clone)]
pub struct TelemetryEmitter {
    logger: Arc<str>,
    sink: Arc<dyn TelemetrySink>,
}

impl fmt::Debug for TelemetryEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryEmitter")
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl TelemetryEmitter {
    /// Creates an emitter that logs through [`TracingSink`].
    #[must_use]
    pub fn new(logger: impl Into<String>) -> Self {
        Self::with_sink(logger, Arc::new(TracingSink))
    }

    /// Creates an emitter with a custom sink.
    #[must_use]
    pub fn with_sink(logger: impl Into<String>, sink: Arc<dyn TelemetrySink>) -> Self {
        let logger: String = logger.into();
        Self {
            logger: Arc::from(logger),
            sink,
        }
    }

    /// The logger name events are reported under.
    #[must_use]
    pub fn logger(&self) -> &str {
        &self.logger
    }

    /// Emits an arbitrary event.
    pub fn emit(&self, event: TelemetryEvent) {
        if let Err(e) = self.sink.record(&self.logger, &event) {
            tracing::warn!(
                logger = %self.logger,
                event = %event.name,
                error = %e,
                "Failed to emit telemetry event"
            );
        }
    }

    /// Emits `http.client.request`.
    pub fn client_request(&self, exchange: &Exchange, url: &str) {
        self.emit(TelemetryEvent::client_request(exchange, url));
    }

    /// Emits `http.client.response`.
    pub fn client_response(&self, exchange: &Exchange, status_code: u16, duration_ms: u64) {
        self.emit(TelemetryEvent::client_response(
            exchange,
            status_code,
            duration_ms,
        ));
    }

    /// Emits `http.client.error`.
    ///
    /// `status_code` is included when the failure was an HTTP status.
    pub fn client_error(
        &self,
        exchange: &Exchange,
        error: &str,
        error_type: &str,
        duration_ms: u64,
        status_code: Option<u16>,
    ) {
        let mut event = TelemetryEvent::client_error(exchange, error, error_type, duration_ms);
        event.status_code = status_code;
        self.emit(event);
    }

    /// Emits `http.server.request`.
    pub fn server_request(&self, exchange: &Exchange, path: &str) {
        self.emit(TelemetryEvent::server_request(exchange, path));
    }

    /// Emits `http.server.response`.
    pub fn server_response(&self, exchange: &Exchange, status_code: u16, duration_ms: u64) {
        self.emit(TelemetryEvent::server_response(
            exchange,
            status_code,
            duration_ms,
        ));
    }

    /// Emits `http.server.error`.
    pub fn server_error(&self, exchange: &Exchange, error: &str, error_type: &str) {
        self.emit(TelemetryEvent::server_error(exchange, error, error_type));
    }
}

impl Default for TelemetryEmitter {
    fn default() -> Self {
        Self::new("meridian")
    }
}
