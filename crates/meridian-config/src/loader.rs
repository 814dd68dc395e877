//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading [`ServiceSettings`]
//! from multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, Environment, ServiceSettings};

/// Suffix of the conventional per-service base URL variables.
const BASE_URL_SUFFIX: &str = "_BASE_URL";

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (TOML or JSON)
/// 3. `<NAME>_BASE_URL` variables (if enabled)
/// 4. `PREFIX__SECTION__KEY` variables (if a prefix is set)
///
/// # Example
///
/// ```no_run
/// use meridian_config::ConfigLoader;
///
/// # fn main() -> Result<(), meridian_config::ConfigError> {
/// let settings = ConfigLoader::new()
///     .with_defaults()
///     .with_file("orders.toml")?
///     .with_base_url_env()
///     .with_env_prefix("MERIDIAN")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    settings: ServiceSettings,
    env_prefix: Option<String>,
    base_url_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: ServiceSettings::default(),
            env_prefix: None,
            base_url_env: false,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.settings = ServiceSettings::default();
        self
    }

    /// Start with development preset configuration.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.settings = ServiceSettings::development();
        self
    }

    /// Start with production preset configuration.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.settings = ServiceSettings::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        self.settings = Self::parse_file(&content, path)?;
        tracing::debug!(path = %path.display(), "Loaded service settings file");

        Ok(self)
    }

    /// Load configuration from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// `format` is `"toml"` or `"json"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use meridian_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     service_name = "orders"
    ///
    ///     [services]
    ///     census = "http://census:8001"
    /// "#;
    ///
    /// let settings = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(settings.services["census"], "http://census:8001");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.settings = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "MERIDIAN":
    /// - `MERIDIAN__SERVICE_NAME=orders`
    /// - `MERIDIAN__HTTP__TIMEOUT_SECS=2.5`
    /// - `MERIDIAN__SERVICES__CENSUS=http://census:8001`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Read `<NAME>_BASE_URL` variables as service base URLs.
    ///
    /// `CENSUS_BASE_URL=http://census:8001` configures the `census` service.
    #[must_use]
    pub fn with_base_url_env(mut self) -> Self {
        self.base_url_env = true;
        self
    }

    /// Load a `.env` file for environment variables.
    ///
    /// # Errors
    ///
    /// Currently infallible; a missing `.env` file is ignored.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(self)
    }

    /// Finalize and return the loaded settings.
    ///
    /// Applies environment overrides, normalizes service names and base URLs,
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment variable cannot be parsed or
    /// validation fails.
    pub fn load(mut self) -> Result<ServiceSettings, ConfigError> {
        self.apply_env_layers()?;

        self.settings.normalize();
        self.settings.validate()?;

        tracing::debug!(
            service = %self.settings.service_name,
            services = self.settings.services.len(),
            "Service settings loaded"
        );

        Ok(self.settings)
    }

    /// Finalize with environment overrides applied but without
    /// normalization or validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Env` if an override variable cannot be parsed.
    pub fn load_unvalidated(mut self) -> Result<ServiceSettings, ConfigError> {
        self.apply_env_layers()?;
        Ok(self.settings)
    }

    fn apply_env_layers(&mut self) -> Result<(), ConfigError> {
        if self.base_url_env {
            self.apply_base_url_vars(env::vars());
        }

        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        Ok(())
    }

    fn parse_file(content: &str, path: &Path) -> Result<ServiceSettings, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::unsupported_format(other.unwrap_or_default())),
        }
    }

    fn apply_base_url_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if key.contains("__") {
                continue;
            }
            let Some(name) = key.strip_suffix(BASE_URL_SUFFIX) else {
                continue;
            };
            if name.is_empty() || value.trim().is_empty() {
                continue;
            }
            self.settings.services.insert(name.to_lowercase(), value);
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["SERVICE_NAME"] => {
                self.settings.service_name = value.to_string();
            }
            ["SERVICE_VERSION"] => {
                self.settings.service_version = value.to_string();
            }
            ["ENVIRONMENT"] => {
                self.settings.environment = value
                    .parse::<Environment>()
                    .map_err(|e| ConfigError::env(key, e.to_string()))?;
            }

            ["LOGGING", "LEVEL"] => {
                self.settings.logging.level = value.to_string();
            }
            ["LOGGING", "JSON"] => {
                self.settings.logging.json = parse_bool(value)
                    .ok_or_else(|| ConfigError::env(key, "expected boolean"))?;
            }

            ["HTTP", "TIMEOUT_SECS"] => {
                self.settings.http.timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env(key, "expected number"))?;
            }

            ["SERVICES", name] if !name.is_empty() => {
                self.settings
                    .services
                    .insert(name.to_lowercase(), value.to_string());
            }

            _ => {
                tracing::debug!(var = %key, "Ignoring unrecognized configuration variable");
            }
        }

        Ok(())
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
