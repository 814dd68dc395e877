//! Error types for Meridian service calls.
//!
//! This module provides the [`ServiceError`] type, the single error type
//! returned by registry lookups, URL resolution and outbound service calls.
//!
//! # Error kinds
//!
//! Every variant maps to a [`ServiceErrorKind`], which is what callers should
//! match on when they only care about the class of failure:
//!
//! | `ServiceErrorKind` | Variants | Telemetry `error_type` |
//! |---|---|---|
//! | `InvalidEndpoint` | `EmptyEndpointKey`, `InvalidContract` | `InvalidEndpointError` |
//! | `DuplicateKey` | `DuplicateKey` | `DuplicateKeyError` |
//! | `EndpointNotFound` | `EndpointNotFound` | `EndpointNotFoundError` |
//! | `ServiceNotConfigured` | `ServiceNotConfigured` | `ServiceNotConfiguredError` |
//! | `MissingPathParameter` | `MissingPathParameter` | `MissingPathParameterError` |
//! | `RequestValidation` | `RequestValidation` | `RequestValidationError` |
//! | `ResponseValidation` | `ResponseValidation`, `ResponseDecode` | `ResponseValidationError` |
//! | `NotFound` | `NotFound` | `ServiceNotFoundError` |
//! | `Timeout` | `Timeout` | `ServiceTimeoutError` |
//! | `Unavailable` | `Unavailable` | `ServiceUnavailableError` |
//! | `Generic` | `Http`, `Transport` | `ServiceError` |

use crate::shape::ShapeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`ServiceError`].
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// The endpoint key or contract is malformed.
    InvalidEndpoint,
    /// An endpoint key was registered twice.
    DuplicateKey,
    /// No contract is registered under the requested key.
    EndpointNotFound,
    /// The target service has no configured base URL.
    ServiceNotConfigured,
    /// A `{placeholder}` in the path template had no value.
    MissingPathParameter,
    /// The request body does not match the declared shape.
    RequestValidation,
    /// The response body does not match the declared shape or type.
    ResponseValidation,
    /// The remote service answered 404.
    NotFound,
    /// The transport deadline was exceeded.
    Timeout,
    /// The remote service answered with a 5xx status.
    Unavailable,
    /// Any other transport or HTTP failure.
    Generic,
}

impl ServiceErrorKind {
    /// Returns the stable name reported as `error_type` in telemetry.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint => "InvalidEndpointError",
            Self::DuplicateKey => "DuplicateKeyError",
            Self::EndpointNotFound => "EndpointNotFoundError",
            Self::ServiceNotConfigured => "ServiceNotConfiguredError",
            Self::MissingPathParameter => "MissingPathParameterError",
            Self::RequestValidation => "RequestValidationError",
            Self::ResponseValidation => "ResponseValidationError",
            Self::NotFound => "ServiceNotFoundError",
            Self::Timeout => "ServiceTimeoutError",
            Self::Unavailable => "ServiceUnavailableError",
            Self::Generic => "ServiceError",
        }
    }
}

/// Standard error type for Meridian.
///
/// Every failure surfaced by the registry, the URL resolver or the service
/// client is one of these variants, so calling code can pattern-match instead
/// of inspecting strings.
///
/// # Example
///
/// ```
/// use meridian_core::{ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::endpoint_not_found("census.get_customer", vec![]);
/// assert_eq!(err.kind(), ServiceErrorKind::EndpointNotFound);
/// assert_eq!(err.error_type(), "EndpointNotFoundError");
/// ```
#[derive(Error, Debug)]
pub enum ServiceError {
    /// An endpoint was registered under an empty key.
    #[error("endpoint key cannot be empty")]
    EmptyEndpointKey,

    /// One or more keys are already registered.
    #[error("endpoint key(s) already registered: {}", keys.join(", "))]
    DuplicateKey {
        /// The conflicting keys.
        keys: Vec<String>,
    },

    /// An endpoint contract failed construction-time validation.
    #[error("invalid endpoint contract: {message}")]
    InvalidContract {
        /// What was wrong with the contract.
        message: String,
    },

    /// No contract is registered under the key.
    #[error("endpoint '{key}' not found in registry")]
    EndpointNotFound {
        /// The requested key.
        key: String,
        /// Keys that are registered.
        available: Vec<String>,
    },

    /// The service has no configured base URL.
    #[error(
        "service '{service}' is not configured (available services: {})",
        display_list(available_services)
    )]
    ServiceNotConfigured {
        /// The requested service name.
        service: String,
        /// Every service that does have a base URL.
        available_services: Vec<String>,
    },

    /// A path placeholder had no matching parameter.
    #[error("missing path parameter '{name}' for endpoint '{endpoint}'")]
    MissingPathParameter {
        /// The placeholder name.
        name: String,
        /// The endpoint key being called.
        endpoint: String,
    },

    /// The request body does not conform to the contract's request shape.
    #[error("request body for endpoint '{endpoint}' is invalid: {source}")]
    RequestValidation {
        /// The endpoint key being called.
        endpoint: String,
        /// The shape violation.
        #[source]
        source: ShapeError,
    },

    /// The response body does not conform to the contract's response shape.
    #[error("response from endpoint '{endpoint}' is invalid: {source}")]
    ResponseValidation {
        /// The endpoint key being called.
        endpoint: String,
        /// The shape violation.
        #[source]
        source: ShapeError,
    },

    /// The response body could not be decoded into the requested type.
    #[error("response from endpoint '{endpoint}' could not be decoded: {message}")]
    ResponseDecode {
        /// The endpoint key being called.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// The remote service answered 404.
    #[error("resource not found at {url}")]
    NotFound {
        /// The endpoint key being called.
        endpoint: String,
        /// The full request URL.
        url: String,
    },

    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        /// The endpoint key being called.
        endpoint: String,
        /// The full request URL.
        url: String,
        /// The effective timeout.
        timeout: Duration,
    },

    /// The remote service answered with a 5xx status.
    #[error("service unavailable: HTTP {status} from {url}")]
    Unavailable {
        /// The endpoint key being called.
        endpoint: String,
        /// The full request URL.
        url: String,
        /// The response status.
        status: u16,
    },

    /// The remote service answered with a non-404 4xx status.
    #[error("HTTP error {status} from {url}: {body}")]
    Http {
        /// The endpoint key being called.
        endpoint: String,
        /// The full request URL.
        url: String,
        /// The response status.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// Any other transport failure.
    #[error("request to endpoint '{endpoint}' failed: {message}")]
    Transport {
        /// The endpoint key being called.
        endpoint: String,
        /// The full request URL, if it was built.
        url: Option<String>,
        /// Human-readable failure description.
        message: String,
        /// The underlying cause.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ServiceError {
    /// Creates an endpoint-not-found error.
    #[must_use]
    pub fn endpoint_not_found(key: impl Into<String>, available: Vec<String>) -> Self {
        Self::EndpointNotFound {
            key: key.into(),
            available,
        }
    }

    /// Creates a service-not-configured error.
    #[must_use]
    pub fn service_not_configured(
        service: impl Into<String>,
        available_services: Vec<String>,
    ) -> Self {
        Self::ServiceNotConfigured {
            service: service.into(),
            available_services,
        }
    }

    /// Creates an invalid contract error.
    #[must_use]
    pub fn invalid_contract(message: impl Into<String>) -> Self {
        Self::InvalidContract {
            message: message.into(),
        }
    }

    /// Creates a missing path parameter error.
    #[must_use]
    pub fn missing_path_parameter(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::MissingPathParameter {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Creates a transport error without an underlying cause.
    #[must_use]
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            url: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying cause.
    #[must_use]
    pub fn transport_with_source(
        endpoint: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        let source = source.into();
        Self::Transport {
            endpoint: endpoint.into(),
            url: Some(url.into()),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::EmptyEndpointKey | Self::InvalidContract { .. } => {
                ServiceErrorKind::InvalidEndpoint
            }
            Self::DuplicateKey { .. } => ServiceErrorKind::DuplicateKey,
            Self::EndpointNotFound { .. } => ServiceErrorKind::EndpointNotFound,
            Self::ServiceNotConfigured { .. } => ServiceErrorKind::ServiceNotConfigured,
            Self::MissingPathParameter { .. } => ServiceErrorKind::MissingPathParameter,
            Self::RequestValidation { .. } => ServiceErrorKind::RequestValidation,
            Self::ResponseValidation { .. } | Self::ResponseDecode { .. } => {
                ServiceErrorKind::ResponseValidation
            }
            Self::NotFound { .. } => ServiceErrorKind::NotFound,
            Self::Timeout { .. } => ServiceErrorKind::Timeout,
            Self::Unavailable { .. } => ServiceErrorKind::Unavailable,
            Self::Http { .. } | Self::Transport { .. } => ServiceErrorKind::Generic,
        }
    }

    /// Returns the name reported as `error_type` in telemetry.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        self.kind().error_type()
    }

    /// Returns the endpoint key this error relates to, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::EndpointNotFound { key, .. } => Some(key),
            Self::MissingPathParameter { endpoint, .. }
            | Self::RequestValidation { endpoint, .. }
            | Self::ResponseValidation { endpoint, .. }
            | Self::ResponseDecode { endpoint, .. }
            | Self::NotFound { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Unavailable { endpoint, .. }
            | Self::Http { endpoint, .. }
            | Self::Transport { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// Returns the remote HTTP status code, if the failure carried one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Unavailable { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for failures a caller-side retry policy may retry.
    ///
    /// Nothing in Meridian retries on its own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ServiceErrorKind::Timeout | ServiceErrorKind::Unavailable
        ) || matches!(self, Self::Transport { .. })
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
