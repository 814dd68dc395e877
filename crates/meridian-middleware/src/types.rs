//! Request, response and failure types used by the pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use meridian_core::{ServiceError, ServiceErrorKind};

/// The HTTP request type used in the middleware pipeline.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Marks a response as the result of a failed handler.
///
/// Handlers attach this to the response extensions instead of returning an
/// error; [`TraceMiddleware`](crate::TraceMiddleware) reports it as
/// `http.server.error` before `http.server.response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Error message.
    pub error: String,
    /// Error type name.
    pub error_type: String,
}

impl HandlerFailure {
    /// Creates a failure record.
    pub fn new(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: error_type.into(),
        }
    }
}

impl From<&ServiceError> for HandlerFailure {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.to_string(), err.error_type())
    }
}

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a plain-text response.
    fn text(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON response.
    fn json(status: StatusCode, body: &serde_json::Value) -> Response;

    /// Creates a JSON error response carrying a [`HandlerFailure`].
    fn failure(status: StatusCode, error_type: &str, message: &str) -> Response;

    /// Maps a failed downstream call to an error response.
    ///
    /// | Error kind | Status |
    /// |---|---|
    /// | `NotFound` | 404 |
    /// | `Unavailable` | 503 |
    /// | `Timeout` | 504 |
    /// | response validation, generic HTTP and transport failures | 502 |
    /// | everything else | 500 |
    fn from_service_error(err: &ServiceError) -> Response;

    /// Returns the attached [`HandlerFailure`], if any.
    fn handler_failure(&self) -> Option<&HandlerFailure>;
}

fn build(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl ResponseExt for Response {
    fn text(status: StatusCode, message: &str) -> Response {
        build(
            status,
            "text/plain; charset=utf-8",
            Bytes::from(message.to_string()),
        )
    }

    fn json(status: StatusCode, body: &serde_json::Value) -> Response {
        build(status, "application/json", Bytes::from(body.to_string()))
    }

    fn failure(status: StatusCode, error_type: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": error_type,
                "message": message
            }
        });
        let mut response = Self::json(status, &body);
        response
            .extensions_mut()
            .insert(HandlerFailure::new(message, error_type));
        response
    }

    fn from_service_error(err: &ServiceError) -> Response {
        let status = match err.kind() {
            ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
            ServiceErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ServiceErrorKind::ResponseValidation | ServiceErrorKind::Generic => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::failure(status, err.error_type(), &err.to_string())
    }

    fn handler_failure(&self) -> Option<&HandlerFailure> {
        self.extensions().get::<HandlerFailure>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_text_response() {
        let response = Response::text(StatusCode::BAD_REQUEST, "Invalid input");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert!(response.handler_failure().is_none());
    }

    #[tokio::test]
    async fn test_failure_response() {
        let response = Response::failure(StatusCode::BAD_GATEWAY, "ServiceError", "boom");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.handler_failure(),
            Some(&HandlerFailure::new("boom", "ServiceError"))
        );

        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "ServiceError");
        assert_eq!(body["error"]["message"], "boom");
    }

    #[test]
    fn test_from_service_error_status() {
        let not_found = ServiceError::NotFound {
            endpoint: "census.get_customer".to_string(),
            url: "http://census/api/customers/1".to_string(),
        };
        let timeout = ServiceError::Timeout {
            endpoint: "census.get_customer".to_string(),
            url: "http://census/api/customers/1".to_string(),
            timeout: Duration::from_secs(1),
        };
        let unavailable = ServiceError::Unavailable {
            endpoint: "census.get_customer".to_string(),
            url: "http://census/api/customers/1".to_string(),
            status: 503,
        };
        let missing = ServiceError::missing_path_parameter("customer_id", "census.get_customer");
        let transport = ServiceError::transport("census.get_customer", "reset");

        assert_eq!(Response::from_service_error(&not_found).status(), 404);
        assert_eq!(Response::from_service_error(&timeout).status(), 504);
        assert_eq!(Response::from_service_error(&unavailable).status(), 503);
        assert_eq!(Response::from_service_error(&missing).status(), 500);
        assert_eq!(Response::from_service_error(&transport).status(), 502);

        let response = Response::from_service_error(&not_found);
        let failure = response.handler_failure().unwrap();
        assert_eq!(failure.error_type, "ServiceNotFoundError");
    }
}
