//! HTTP transport abstraction.
//!
//! [`ServiceClient`](crate::ServiceClient) never talks to the network itself.
//! It hands an [`OutboundRequest`] to a [`Transport`], which is
//! [`ReqwestTransport`] in production and an in-memory mock in tests.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::header::HeaderMap;
use meridian_core::HttpMethod;
use reqwest::Client;
use thiserror::Error;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Failures below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// No connection could be established.
    #[error("connection failed: {message}")]
    Connect {
        /// Failure description.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Failure description.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl TransportError {
    /// Create a connection error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic error without an underlying cause.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect {
                message: err.to_string(),
                source: Some(err.into()),
            }
        } else {
            Self::Other {
                message: err.to_string(),
                source: Some(err.into()),
            }
        }
    }
}

/// A fully built outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL including the query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encoded JSON body.
    pub body: Option<Bytes>,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
}

impl OutboundRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: HttpMethod, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout,
        }
    }

    /// Returns a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The response to an [`OutboundRequest`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends outbound requests.
pub trait Transport: Send + Sync + 'static {
    /// Dispatches `request` and waits for the complete response.
    fn send(&self, request: OutboundRequest)
        -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a new connection pool.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the client cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| TransportError::other(format!("failed to create client: {e}")))?;
        Ok(Self { client })
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(http::Method::from(request.method), &request.url)
                .headers(request.headers)
                .timeout(request.timeout);

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}
