//! Structured JSON logging.
//!
//! In JSON mode every log line is one record with a fixed top-level layout:
//!
//! ```json
//! {
//!   "timestamp": "2024-05-01T12:00:00.000Z",
//!   "level": "INFO",
//!   "logger": "orders.clients",
//!   "message": "http.client.request",
//!   "trace_id": "UICALL.C32PO",
//!   "service": "orders",
//!   "version": "1.4.0",
//!   "environment": "production",
//!   "data": { "name": "http.client.request", "direction": "outbound", "...": "..." }
//! }
//! ```
//!
//! `trace_id` is read from the [`TraceContext`] of the task that logged the
//! event. For telemetry events `data` is the event itself; for ordinary log
//! lines it holds the event's fields.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(customer_id = 123, "Loaded customer");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use chrono::{SecondsFormat, Utc};
use meridian_core::TraceContext;
use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "meridian=debug,reqwest=warn").
    pub level: String,

    /// Emit structured JSON records instead of human-readable output.
    pub json_format: bool,

    /// Whether to include file/line info in human-readable output.
    pub file_line_info: bool,

    /// Service name written to every record.
    pub service_name: String,

    /// Service version written to every record.
    pub service_version: String,

    /// Deployment environment written to every record.
    pub environment: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            file_line_info: false,
            service_name: "meridian".to_string(),
            service_version: "dev".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            environment: "production".to_string(),
            ..Self::default()
        }
    }
}

/// Initializes the global `tracing` subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a bad level directive and
/// `TelemetryError::Subscriber` if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .event_format(StructuredJsonFormat::from_config(config))
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Event formatter producing one JSON record per line.
#[derive(Debug, Clone)]
pub struct StructuredJsonFormat {
    service: String,
    version: String,
    environment: String,
}

impl StructuredJsonFormat {
    /// Creates a formatter that stamps records with the given service identity.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            environment: environment.into(),
        }
    }

    /// Creates a formatter from a [`LogConfig`].
    #[must_use]
    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(
            &config.service_name,
            &config.service_version,
            &config.environment,
        )
    }

    fn record(&self, event: &Event<'_>) -> Value {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let metadata = event.metadata();
        let logger = collector
            .logger
            .take()
            .unwrap_or_else(|| metadata.target().to_string());

        let data = match collector.data.take() {
            Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            None => Value::Object(std::mem::take(&mut collector.values)),
        };

        let mut record = Map::new();
        record.insert(
            fields::TIMESTAMP.into(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        record.insert(fields::LEVEL.into(), metadata.level().to_string().into());
        record.insert(fields::LOGGER.into(), logger.into());
        if let Some(message) = collector.message.take() {
            record.insert(fields::MESSAGE.into(), message.into());
        }
        record.insert(
            fields::TRACE_ID.into(),
            TraceContext::current().map_or(Value::Null, |id| Value::String(id.into())),
        );
        record.insert(fields::SERVICE.into(), self.service.clone().into());
        record.insert(fields::VERSION.into(), self.version.clone().into());
        record.insert(fields::ENVIRONMENT.into(), self.environment.clone().into());
        record.insert(fields::DATA.into(), data);
        Value::Object(record)
    }
}

impl<S, N> FormatEvent<S, N> for StructuredJsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let line = serde_json::to_string(&self.record(event)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Collects an event's fields, separating the ones with a fixed role.
#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    logger: Option<String>,
    data: Option<String>,
    values: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        self.values.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "logger" => self.logger = Some(value.to_string()),
            "data" => self.data = Some(value.to_string()),
            _ => self.insert(field, value.into()),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }
}

/// Standard log record field names.
pub mod fields {
    /// RFC 3339 timestamp.
    pub const TIMESTAMP: &str = "timestamp";

    /// Upper-case level name.
    pub const LEVEL: &str = "level";

    /// Logger name.
    pub const LOGGER: &str = "logger";

    /// Log message.
    pub const MESSAGE: &str = "message";

    /// Trace id of the request being handled.
    pub const TRACE_ID: &str = "trace_id";

    /// Service name.
    pub const SERVICE: &str = "service";

    /// Service version.
    pub const VERSION: &str = "version";

    /// Deployment environment.
    pub const ENVIRONMENT: &str = "environment";

    /// Event payload.
    pub const DATA: &str = "data";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::TelemetryEmitter;
    use crate::events::Exchange;
    use meridian_core::TraceId;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn records(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<Value> {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .event_format(StructuredJsonFormat::new("orders", "1.4.0", "staging"))
            .with_writer(buffer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        buffer.records()
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config.service_version, "dev");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_production_config() {
        let config = LogConfig::production();
        assert!(config.json_format);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("meridian=debug,reqwest=warn").is_ok());
        assert!(matches!(
            create_env_filter("meridian=["),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_telemetry_record_schema() {
        let records = capture(|| {
            let id = TraceId::parse("UICALL.C32PO").unwrap();
            TraceContext::sync_scope(Some(id), || {
                TelemetryEmitter::new("orders.clients").client_response(
                    &Exchange::new("census.get_customer", "census", "GET"),
                    200,
                    12,
                );
            });
        });

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "INFO");
        assert_eq!(record["logger"], "orders.clients");
        assert_eq!(record["message"], "http.client.response");
        assert_eq!(record["trace_id"], "UICALL.C32PO");
        assert_eq!(record["service"], "orders");
        assert_eq!(record["version"], "1.4.0");
        assert_eq!(record["environment"], "staging");
        assert_eq!(record["data"]["name"], "http.client.response");
        assert_eq!(record["data"]["status_code"], 200);
        assert_eq!(record["data"]["duration_ms"], 12);
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_error_status_is_logged_at_error() {
        let records = capture(|| {
            TelemetryEmitter::new("orders.clients").client_response(
                &Exchange::new("census.get_customer", "census", "GET"),
                503,
                12,
            );
        });
        assert_eq!(records[0]["level"], "ERROR");
        assert_eq!(records[0]["trace_id"], Value::Null);
    }

    #[test]
    fn test_plain_log_line_fields_go_to_data() {
        let records = capture(|| {
            tracing::warn!(customer_id = 7_u64, cached = true, "Cache miss");
        });
        let record = &records[0];
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["message"], "Cache miss");
        assert_eq!(record["data"]["customer_id"], 7);
        assert_eq!(record["data"]["cached"], true);
        assert!(record["logger"].as_str().unwrap().contains("logging"));
    }
}
