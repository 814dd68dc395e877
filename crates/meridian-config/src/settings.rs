//! Service settings.
//!
//! [`ServiceSettings`] is the root configuration of a Meridian service: its
//! own identity, logging, outbound HTTP defaults and the base URL of every
//! service it calls.
//!
//! ```toml
//! service_name = "orders"
//! service_version = "1.4.0"
//! environment = "production"
//!
//! [logging]
//! level = "info"
//! json = true
//!
//! [http]
//! timeout_secs = 10.0
//!
//! [services]
//! census = "http://census:8001"
//! billing = "https://billing.internal"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use meridian_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Pre-production.
    Staging,
    /// Production.
    Production,
}

impl Environment {
    /// Returns the lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::invalid_value(
                "environment",
                format!("expected 'development', 'staging' or 'production', got '{s}'"),
            )),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSettings {
    /// Filter directive.
    pub level: String,

    /// Emit JSON records instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Outbound HTTP defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HttpSettings {
    /// Timeout for calls whose contract sets none, in seconds.
    pub timeout_secs: f64,
}

impl HttpSettings {
    /// The default timeout as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless `timeout_secs` is a
    /// positive, finite number of seconds.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or_else(|| {
                ConfigError::invalid_value(
                    "http.timeout_secs",
                    format!("must be positive, got {}", self.timeout_secs),
                )
            })
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 10.0 }
    }
}

/// Complete settings of one service.
///
/// # Example
///
/// ```
/// use meridian_config::ServiceSettings;
///
/// let settings = ServiceSettings::new("orders")
///     .with_service("census", "http://census:8001/");
///
/// assert_eq!(settings.services["census"], "http://census:8001");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceSettings {
    /// This service's name, sent as `X-Service-Name`.
    #[serde(default)]
    pub service_name: String,

    /// This service's version.
    #[serde(default = "default_version")]
    pub service_version: String,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Outbound HTTP defaults.
    #[serde(default)]
    pub http: HttpSettings,

    /// Base URL of each callable service, keyed by lower-case service name.
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

fn default_version() -> String {
    "dev".to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            service_version: default_version(),
            environment: Environment::default(),
            logging: LoggingSettings::default(),
            http: HttpSettings::default(),
            services: BTreeMap::new(),
        }
    }
}

impl ServiceSettings {
    /// Creates settings for `service_name` with defaults everywhere else.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    /// Adds a service base URL.
    #[must_use]
    pub fn with_service(mut self, name: &str, base_url: &str) -> Self {
        self.services
            .insert(name.to_lowercase(), normalize_base_url(base_url));
        self
    }

    /// Development preset: human-readable debug logging.
    #[must_use]
    pub fn development() -> Self {
        let mut settings = Self::new("");
        settings.environment = Environment::Development;
        settings.logging.level = "debug".to_string();
        settings.logging.json = false;
        settings
    }

    /// Production preset: JSON logging at info.
    #[must_use]
    pub fn production() -> Self {
        let mut settings = Self::new("");
        settings.environment = Environment::Production;
        settings.logging.level = "info".to_string();
        settings.logging.json = true;
        settings
    }

    /// Lower-cases service names and strips trailing slashes from base URLs.
    pub fn normalize(&mut self) {
        let services = std::mem::take(&mut self.services);
        self.services = services
            .into_iter()
            .map(|(name, url)| (name.trim().to_lowercase(), normalize_base_url(&url)))
            .collect();
    }

    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `service_name` is empty
    /// - `http.timeout_secs` is not a positive finite number
    /// - A base URL is not an absolute `http` or `https` URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::missing_field("service_name"));
        }

        self.http.timeout()?;

        for (name, base_url) in &self.services {
            if name.is_empty() {
                return Err(ConfigError::invalid_value("services", "service name cannot be empty"));
            }
            let parsed = Url::parse(base_url)
                .map_err(|e| ConfigError::invalid_base_url(name, base_url, e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::invalid_base_url(
                    name,
                    base_url,
                    format!("scheme must be http or https, got '{}'", parsed.scheme()),
                ));
            }
            if parsed.host_str().is_none() {
                return Err(ConfigError::invalid_base_url(name, base_url, "no host"));
            }
        }

        Ok(())
    }

    /// Builds the logging configuration for these settings.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: true,
            level: self.logging.level.clone(),
            json_format: self.logging.json,
            file_line_info: !self.logging.json,
            service_name: self.service_name.clone(),
            service_version: self.service_version.clone(),
            environment: self.environment.to_string(),
        }
    }

    /// Builds the full telemetry setup: [`log_config`](Self::log_config)
    /// plus the default Prometheus recorder.
    #[must_use]
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.log_config(),
            metrics: MetricsConfig::default(),
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ServiceSettings::new("orders");
        assert_eq!(settings.service_version, "dev");
        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.json);
        assert_eq!(settings.http.timeout().unwrap(), Duration::from_secs(10));
        assert!(settings.services.is_empty());
    }

    #[test]
    fn test_with_service_normalizes() {
        let settings = ServiceSettings::new("orders").with_service("Census", "http://census:8001//");
        assert_eq!(settings.services["census"], "http://census:8001");
    }

    #[test]
    fn test_normalize() {
        let mut settings = ServiceSettings::new("orders");
        settings
            .services
            .insert("Billing ".to_string(), " https://billing.internal/api/ ".to_string());
        settings.normalize();
        assert_eq!(settings.services["billing"], "https://billing.internal/api");
    }

    #[test]
    fn test_validate_requires_service_name() {
        let err = ServiceSettings::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_validate_timeout() {
        let mut settings = ServiceSettings::new("orders");
        settings.http.timeout_secs = 0.0;
        assert!(settings.validate().is_err());

        settings.http.timeout_secs = f64::NAN;
        assert!(settings.validate().is_err());

        settings.http.timeout_secs = -1.0;
        assert!(matches!(
            settings.http.timeout(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "http.timeout_secs"
        ));

        settings.http.timeout_secs = f64::INFINITY;
        assert!(settings.http.timeout().is_err());

        settings.http.timeout_secs = 0.5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_base_urls() {
        assert!(ServiceSettings::new("orders")
            .with_service("census", "http://localhost:8001")
            .validate()
            .is_ok());

        let err = ServiceSettings::new("orders")
            .with_service("census", "localhost:8001")
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
        assert_eq!(err.subject(), Some("census"));

        assert!(ServiceSettings::new("orders")
            .with_service("census", "ftp://census")
            .validate()
            .is_err());

        assert!(ServiceSettings::new("orders")
            .with_service("census", "not a url")
            .validate()
            .is_err());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(Environment::Staging.to_string(), "staging");
    }

    #[test]
    fn test_presets() {
        let dev = ServiceSettings::development();
        assert_eq!(dev.logging.level, "debug");
        assert!(!dev.logging.json);

        let prod = ServiceSettings::production();
        assert_eq!(prod.environment, Environment::Production);
        assert!(prod.logging.json);
    }

    #[test]
    fn test_log_config_bridge() {
        let mut settings = ServiceSettings::production();
        settings.service_name = "orders".to_string();
        settings.service_version = "1.4.0".to_string();

        let log = settings.log_config();
        assert_eq!(log.service_name, "orders");
        assert_eq!(log.service_version, "1.4.0");
        assert_eq!(log.environment, "production");
        assert!(log.json_format);
        assert!(!log.file_line_info);
    }

    #[test]
    fn test_telemetry_config_bridge() {
        let settings = ServiceSettings::new("orders");
        let telemetry = settings.telemetry_config();
        assert_eq!(telemetry.service_name(), "orders");
        assert_eq!(telemetry.logging, settings.log_config());
        assert!(telemetry.metrics.enabled);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: Result<ServiceSettings, _> = toml::from_str(
            r#"
            service_name = "orders"
            unknown = 1
            "#,
        );
        assert!(result.is_err());

        let result: Result<ServiceSettings, _> = toml::from_str(
            r#"
            service_name = "orders"
            [http]
            timeout = 3
            "#,
        );
        assert!(result.is_err());
    }
}
