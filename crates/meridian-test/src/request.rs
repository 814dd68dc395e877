//! Inbound request building.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;
use meridian_core::headers::{HEADER_SERVICE_NAME, HEADER_TRACE_ID};
use meridian_middleware::Request;
use serde::Serialize;

use crate::error::TestError;

/// Builder for requests sent through a [`TestServer`](crate::TestServer).
///
/// ```
/// use meridian_test::TestRequest;
///
/// let request = TestRequest::get("/api/customers/1")
///     .trace_id("UICALL")
///     .service_name("orders")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.headers()["x-trace-id"], "UICALL");
/// assert_eq!(request.headers()["x-service-name"], "orders");
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    /// Starts a request with an arbitrary method.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Starts a GET request.
    pub fn get(uri: impl AsRef<str>) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(uri: impl AsRef<str>) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(uri: impl AsRef<str>) -> Self {
        Self::new(Method::PUT, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> Self {
        Self::new(Method::DELETE, uri)
    }

    /// Sets a header.
    ///
    /// # Panics
    ///
    /// Panics if the name or value is not a valid header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref()).expect("valid header name");
        let value = HeaderValue::try_from(value.as_ref()).expect("valid header value");
        self.headers.insert(name, value);
        self
    }

    /// Sets the inbound `X-Trace-ID`.
    pub fn trace_id(self, trace_id: impl AsRef<str>) -> Self {
        self.header(HEADER_TRACE_ID.as_str(), trace_id)
    }

    /// Sets the calling service's `X-Service-Name`.
    pub fn service_name(self, name: impl AsRef<str>) -> Self {
        self.header(HEADER_SERVICE_NAME.as_str(), name)
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be serialized.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        let bytes = serde_json::to_vec(value).expect("JSON serialization should succeed");
        self.body = Bytes::from(bytes);
        self.header(CONTENT_TYPE.as_str(), "application/json")
    }

    /// Builds the pipeline request.
    pub fn build(self) -> Result<Request, TestError> {
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        let mut request = http::Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}
