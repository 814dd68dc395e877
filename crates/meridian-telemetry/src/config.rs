//! Process-wide telemetry setup.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// What [`init_telemetry`](crate::init_telemetry) installs.
///
/// The service identity lives in [`LogConfig`] because every log record
/// carries it; [`with_logging`](Self::with_logging) keeps the identity when
/// swapping the rest of the logging setup.
///
/// ```
/// use meridian_telemetry::{LogConfig, TelemetryConfig};
///
/// let config = TelemetryConfig::for_service("orders", "1.4.0", "production")
///     .with_logging(LogConfig::development())
///     .without_metrics();
///
/// assert_eq!(config.service_name(), "orders");
/// assert_eq!(config.logging.environment, "production");
/// assert!(!config.logging.json_format);
/// assert!(!config.metrics.enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Log subscriber setup, including the service identity.
    pub logging: LogConfig,

    /// Prometheus recorder setup.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Default logging and metrics for the given service identity.
    #[must_use]
    pub fn for_service(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            logging: LogConfig {
                service_name: service_name.into(),
                service_version: service_version.into(),
                environment: environment.into(),
                ..LogConfig::default()
            },
            metrics: MetricsConfig::default(),
        }
    }

    /// Replaces the logging setup but keeps the current service identity.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        let identity = self.logging;
        self.logging = LogConfig {
            service_name: identity.service_name,
            service_version: identity.service_version,
            environment: identity.environment,
            ..logging
        };
        self
    }

    /// Replaces the metrics setup.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }

    /// Skips installing the Prometheus recorder.
    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        self.metrics.enabled = false;
        self
    }

    /// The service name stamped on every log record.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.logging.service_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_service() {
        let config = TelemetryConfig::for_service("orders", "2.0.0", "staging");
        assert_eq!(config.logging.service_version, "2.0.0");
        assert_eq!(config.logging.level, "info");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_with_logging_keeps_identity() {
        let logging = LogConfig {
            level: "meridian=debug".to_string(),
            service_name: "ignored".to_string(),
            ..LogConfig::default()
        };
        let config = TelemetryConfig::for_service("orders", "1.2.3", "staging").with_logging(logging);

        assert_eq!(config.service_name(), "orders");
        assert_eq!(config.logging.level, "meridian=debug");
    }

    #[test]
    fn test_with_metrics() {
        let metrics = MetricsConfig {
            duration_buckets: vec![0.1, 1.0],
            ..MetricsConfig::default()
        };
        let config = TelemetryConfig::default().with_metrics(metrics);
        assert_eq!(config.metrics.duration_buckets, vec![0.1, 1.0]);
    }
}
