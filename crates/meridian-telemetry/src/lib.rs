//! Structured telemetry for Meridian services.
//!
//! - **Events**: the six canonical HTTP events ([`TelemetryEmitter`])
//! - **Logging**: one JSON record per line, stamped with the current trace id
//! - **Metrics**: Prometheus-format counters and histograms via the `metrics` crate
//!
//! # Record Layout
//!
//! ```text
//! {"timestamp": ..., "level": ..., "logger": ..., "message": ..., "trace_id": ...,
//!  "service": ..., "version": ..., "environment": ..., "data": {...}}
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::for_service("orders", "1.4.0", "production"))?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod emitter;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use emitter::{TelemetryEmitter, TelemetrySink, TracingSink, TELEMETRY_TARGET};
pub use error::TelemetryError;
pub use events::{Direction, EventName, Exchange, TelemetryEvent};
pub use logging::{init_logging, LogConfig, StructuredJsonFormat};
pub use metrics::{init_metrics, render_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging and metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
