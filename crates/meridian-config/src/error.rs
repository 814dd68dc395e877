//! Settings errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating [`ServiceSettings`](crate::ServiceSettings).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required settings file does not exist.
    #[error("settings file not found: {}", path.display())]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A settings file exists but could not be read.
    #[error("cannot read settings file {}", path.display())]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// The file extension or format name is neither TOML nor JSON.
    #[error("unsupported settings format '{format}', expected toml or json")]
    UnsupportedFormat {
        /// The rejected extension or format name.
        format: String,
    },

    /// TOML settings failed to deserialize.
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON settings failed to deserialize.
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// A required setting is empty.
    #[error("setting '{field}' is required")]
    MissingField {
        /// Dotted setting name.
        field: String,
    },

    /// A setting has an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted setting name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A service base URL is not an absolute http(s) URL.
    #[error("base URL '{base_url}' for service '{service}' is invalid: {reason}")]
    InvalidBaseUrl {
        /// Service name.
        service: String,
        /// The configured URL.
        base_url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be applied.
    #[error("cannot apply environment variable {var}: {reason}")]
    Env {
        /// Variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_base_url(
        service: impl Into<String>,
        base_url: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidBaseUrl {
            service: service.into(),
            base_url: base_url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Name of the setting, service or variable the error is about, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidValue { field, .. } => Some(field),
            Self::InvalidBaseUrl { service, .. } => Some(service),
            Self::Env { var, .. } => Some(var),
            _ => None,
        }
    }
}
