//! Prometheus metrics for service calls.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `meridian_client_requests_total` | Counter | `service`, `endpoint`, `outcome` | Outbound calls |
//! | `meridian_client_request_duration_seconds` | Histogram | `service`, `endpoint` | Outbound call latency |
//! | `meridian_server_requests_total` | Counter | `url_name`, `status` | Inbound requests |
//! | `meridian_server_request_duration_seconds` | Histogram | `url_name` | Inbound request latency |
//! | `meridian_in_flight_requests` | Gauge | - | Inbound requests being handled |
//!
//! The recorder is installed without an HTTP listener; the host service
//! exposes [`render_metrics`] on whatever endpoint it serves.
//!
//! # Example
//!
//! ```rust,ignore
//! use meridian_telemetry::metrics::record_client_call;
//!
//! record_client_call("census", "census.get_customer", "success", Duration::from_millis(45));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for the duration metrics, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// # Errors
///
/// Returns `TelemetryError::Buckets` if the buckets are invalid and
/// `TelemetryError::Recorder` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::Buckets(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::Recorder(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "meridian_client_requests_total",
        "Total number of outbound service calls by outcome"
    );
    describe_histogram!(
        "meridian_client_request_duration_seconds",
        "Outbound service call duration in seconds"
    );
    describe_counter!(
        "meridian_server_requests_total",
        "Total number of inbound HTTP requests by status"
    );
    describe_histogram!(
        "meridian_server_request_duration_seconds",
        "Inbound HTTP request duration in seconds"
    );
    describe_gauge!(
        "meridian_in_flight_requests",
        "Number of inbound HTTP requests currently being handled"
    );
}

/// Records a finished outbound call.
///
/// `outcome` is `"success"` or the error type of the failure.
pub fn record_client_call(service: &str, endpoint: &str, outcome: &str, duration: Duration) {
    counter!(
        "meridian_client_requests_total",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "meridian_client_request_duration_seconds",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a finished inbound request.
pub fn record_server_request(url_name: &str, status_code: u16, duration: Duration) {
    counter!(
        "meridian_server_requests_total",
        "url_name" => url_name.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "meridian_server_request_duration_seconds",
        "url_name" => url_name.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Guard that tracks one in-flight inbound request.
///
/// The gauge is decremented on drop, including during unwinding.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("meridian_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("meridian_in_flight_requests").decrement(1.0);
    }
}
