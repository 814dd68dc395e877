//! Test response wrapper.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::BodyExt;
use meridian_core::headers::HEADER_TRACE_ID;
use meridian_core::TraceId;
use meridian_middleware::{HandlerFailure, Response};
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A collected response with assertion helpers.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    failure: Option<HandlerFailure>,
}

impl TestResponse {
    /// Collects a pipeline response.
    pub async fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            failure: parts.extensions.get::<HandlerFailure>().cloned(),
            headers: parts.headers,
            body,
        })
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the parsed `X-Trace-ID` response header.
    #[must_use]
    pub fn trace_id(&self) -> Option<TraceId> {
        self.header_str(HEADER_TRACE_ID.as_str())
            .and_then(|v| TraceId::parse(v).ok())
    }

    /// Returns the failure the handler attached, if any.
    #[must_use]
    pub fn handler_failure(&self) -> Option<&HandlerFailure> {
        self.failure.as_ref()
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Asserts that the status code equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {}, got {}",
            expected,
            self.status.as_u16()
        );
        self
    }

    /// Asserts that the response trace id extends `inbound` by one segment.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or is not a direct child of `inbound`.
    pub fn assert_trace_child_of(&self, inbound: &str) -> &Self {
        let trace_id = self.trace_id().expect("response carries X-Trace-ID");
        let parent = TraceId::parse(inbound).expect("valid inbound trace id");
        assert!(
            parent.is_ancestor_of(&trace_id) && trace_id.depth() == parent.depth() + 1,
            "Expected a child of {parent}, got {trace_id}"
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_middleware::ResponseExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_response() {
        let mut response = Response::json(StatusCode::OK, &json!({"id": "1"}));
        response
            .headers_mut()
            .insert(HEADER_TRACE_ID.clone(), "UICALL.C32PO".parse().unwrap());

        let response = TestResponse::from_response(response).await.unwrap();
        response
            .assert_status_code(200)
            .assert_trace_child_of("UICALL");
        assert_eq!(response.json::<serde_json::Value>().unwrap()["id"], "1");
        assert!(response.handler_failure().is_none());
    }

    #[tokio::test]
    async fn test_failure_is_kept() {
        let response = Response::failure(StatusCode::BAD_GATEWAY, "ServiceError", "boom");
        let response = TestResponse::from_response(response).await.unwrap();
        assert_eq!(response.handler_failure().unwrap().error, "boom");
    }
}
