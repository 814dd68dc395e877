//! Endpoint contract types.
//!
//! An [`EndpointContract`] describes one callable endpoint of a peer service:
//! which service owns it, the path template, the HTTP method, the optional
//! request and response shapes and an optional per-endpoint timeout.
//! Contracts are validated when built and are immutable afterwards.
//!
//! # Example
//!
//! ```
//! use meridian_core::{EndpointContract, HttpMethod, Shape};
//! use std::time::Duration;
//!
//! let contract = EndpointContract::builder("census", "/api/customers/{customer_id}")
//!     .method(HttpMethod::Get)
//!     .response_shape(Shape::object([
//!         ("id", Shape::string().required()),
//!         ("name", Shape::string().required()),
//!     ]))
//!     .timeout(Duration::from_secs(5))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(contract.service(), "census");
//! assert_eq!(contract.placeholders().collect::<Vec<_>>(), vec!["customer_id"]);
//! ```

use crate::error::{ServiceError, ServiceResult};
use crate::shape::Shape;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP methods an endpoint can be called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Every supported method.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
    ];

    /// Returns the canonical upper-case method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns `true` if requests with this method transmit a body.
    #[must_use]
    pub const fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ServiceError::invalid_contract(format!("unsupported HTTP method: {s}")))
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Head => Self::HEAD,
            HttpMethod::Options => Self::OPTIONS,
        }
    }
}

/// A piece of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Placeholder(String),
}

/// Immutable description of one callable endpoint.
///
/// Built with [`EndpointContract::builder`]; construction fails if the
/// service name is empty, the path template is empty, does not start with
/// `/`, or contains malformed `{placeholders}`.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointContract {
    service: String,
    path_template: String,
    method: HttpMethod,
    request_shape: Option<Shape>,
    response_shape: Option<Shape>,
    timeout: Option<Duration>,
    description: Option<String>,
    parts: Vec<TemplatePart>,
}

impl EndpointContract {
    /// Starts building a contract for `service` at `path_template`.
    ///
    /// The method defaults to GET.
    #[must_use]
    pub fn builder(
        service: impl Into<String>,
        path_template: impl Into<String>,
    ) -> EndpointContractBuilder {
        EndpointContractBuilder {
            service: service.into(),
            path_template: path_template.into(),
            method: HttpMethod::Get,
            request_shape: None,
            response_shape: None,
            timeout: None,
            description: None,
        }
    }

    /// Logical name of the service that owns this endpoint.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Path template, e.g. `/api/customers/{customer_id}`.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Shape the request body must satisfy, if any.
    #[must_use]
    pub const fn request_shape(&self) -> Option<&Shape> {
        self.request_shape.as_ref()
    }

    /// Shape the response body must satisfy, if any.
    #[must_use]
    pub const fn response_shape(&self) -> Option<&Shape> {
        self.response_shape.as_ref()
    }

    /// Per-endpoint timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the effective timeout given a client-level default.
    #[must_use]
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Names of the `{placeholders}` in the path template, in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Placeholder(name) => Some(name.as_str()),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder with its value from `params`.
    ///
    /// Values are inserted literally. Entries in `params` that match no
    /// placeholder are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MissingPathParameter`] naming the first
    /// placeholder without a value.
    pub fn render_path(
        &self,
        endpoint_key: &str,
        params: &IndexMap<String, String>,
    ) -> ServiceResult<String> {
        let mut path = String::with_capacity(self.path_template.len());
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => path.push_str(text),
                TemplatePart::Placeholder(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| ServiceError::missing_path_parameter(name, endpoint_key))?;
                    path.push_str(value);
                }
            }
        }
        Ok(path)
    }
}

/// Builder for [`EndpointContract`].
#[derive(Debug, Clone)]
pub struct EndpointContractBuilder {
    service: String,
    path_template: String,
    method: HttpMethod,
    request_shape: Option<Shape>,
    response_shape: Option<Shape>,
    timeout: Option<Duration>,
    description: Option<String>,
}

impl EndpointContractBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the request body shape.
    #[must_use]
    pub fn request_shape(mut self, shape: Shape) -> Self {
        self.request_shape = Some(shape);
        self
    }

    /// Sets the response body shape.
    #[must_use]
    pub fn response_shape(mut self, shape: Shape) -> Self {
        self.response_shape = Some(shape);
        self
    }

    /// Sets a per-endpoint timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validates and builds the contract.
    pub fn build(self) -> ServiceResult<EndpointContract> {
        if self.service.trim().is_empty() {
            return Err(ServiceError::invalid_contract("service name cannot be empty"));
        }
        if self.path_template.is_empty() {
            return Err(ServiceError::invalid_contract("path template cannot be empty"));
        }
        if !self.path_template.starts_with('/') {
            return Err(ServiceError::invalid_contract(format!(
                "path template must start with '/': {}",
                self.path_template
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ServiceError::invalid_contract("timeout must be positive"));
        }
        let parts = parse_template(&self.path_template)?;

        Ok(EndpointContract {
            service: self.service,
            path_template: self.path_template,
            method: self.method,
            request_shape: self.request_shape,
            response_shape: self.response_shape,
            timeout: self.timeout,
            description: self.description,
            parts,
        })
    }
}

fn parse_template(template: &str) -> ServiceResult<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(ServiceError::invalid_contract(format!(
                "unbalanced '}}' in path template: {template}"
            )));
        }
        let close = rest[open + 1..]
            .find(['{', '}'])
            .filter(|idx| rest.as_bytes()[open + 1 + idx] == b'}')
            .ok_or_else(|| {
                ServiceError::invalid_contract(format!(
                    "unterminated placeholder in path template: {template}"
                ))
            })?;
        let name = &rest[open + 1..open + 1 + close];
        if name.trim().is_empty() {
            return Err(ServiceError::invalid_contract(format!(
                "empty placeholder in path template: {template}"
            )));
        }
        if open > 0 {
            parts.push(TemplatePart::Literal(rest[..open].to_string()));
        }
        parts.push(TemplatePart::Placeholder(name.to_string()));
        rest = &rest[open + close + 2..];
    }

    if !rest.is_empty() {
        parts.push(TemplatePart::Literal(rest.to_string()));
    }
    Ok(parts)
}
