//! In-memory transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use meridian_client::{BoxFuture, OutboundRequest, Transport, TransportError, TransportResponse};
use meridian_core::HttpMethod;
use parking_lot::Mutex;
use serde_json::Value;

/// What a registered route answers with.
#[derive(Debug, Clone)]
enum Reply {
    Response { status: u16, body: Bytes },
    Timeout,
    Error(String),
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<(HttpMethod, String), Reply>,
    requests: Vec<OutboundRequest>,
    latency: Option<Duration>,
}

/// [`Transport`] that answers from registered routes and records every
/// request it receives.
///
/// Routes are keyed by method and full URL. A request whose URL has a query
/// string also matches a route registered for the URL without it. A request
/// with no matching route fails with [`TransportError::Other`].
///
/// Clones share routes and recorded requests, so a test can keep one handle
/// and give another to the client.
///
/// # Example
///
/// ```
/// use meridian_core::HttpMethod;
/// use meridian_test::MockTransport;
/// use serde_json::json;
///
/// let transport = MockTransport::new();
/// transport.register_json(
///     HttpMethod::Get,
///     "http://census:8001/api/customers/123",
///     200,
///     &json!({"id": "123"}),
/// );
/// assert_eq!(transport.dispatch_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = Some(latency);
        self
    }

    /// Answers `method url` with `status` and a raw body.
    pub fn register_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        body: impl Into<Bytes>,
    ) {
        self.insert(
            method,
            url,
            Reply::Response {
                status,
                body: body.into(),
            },
        );
    }

    /// Answers `method url` with `status` and a JSON body.
    pub fn register_json(&self, method: HttpMethod, url: impl Into<String>, status: u16, body: &Value) {
        self.register_response(method, url, status, body.to_string());
    }

    /// Fails `method url` with a transport error carrying `message`.
    pub fn register_error(&self, method: HttpMethod, url: impl Into<String>, message: impl Into<String>) {
        self.insert(method, url, Reply::Error(message.into()));
    }

    /// Fails `method url` with [`TransportError::Timeout`].
    pub fn register_timeout(&self, method: HttpMethod, url: impl Into<String>) {
        self.insert(method, url, Reply::Timeout);
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.state.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Number of requests received so far, matched or not.
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Forgets recorded requests but keeps routes.
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    fn insert(&self, method: HttpMethod, url: impl Into<String>, reply: Reply) {
        self.state.lock().routes.insert((method, url.into()), reply);
    }

    fn lookup(&self, request: &OutboundRequest) -> (Option<Reply>, Option<Duration>) {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        let exact = (request.method, request.url.clone());
        let reply = state.routes.get(&exact).cloned().or_else(|| {
            let (without_query, _) = request.url.split_once('?')?;
            state
                .routes
                .get(&(request.method, without_query.to_string()))
                .cloned()
        });
        (reply, state.latency)
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        let (reply, latency) = self.lookup(&request);
        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            match reply {
                Some(Reply::Response { status, body }) => Ok(TransportResponse::new(status, body)),
                Some(Reply::Timeout) => Err(TransportError::Timeout),
                Some(Reply::Error(message)) => Err(TransportError::connect(message)),
                None => Err(TransportError::other(format!(
                    "no mock registered for {} {}",
                    request.method, request.url
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(url: &str) -> OutboundRequest {
        OutboundRequest::new(HttpMethod::Get, url, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_registered_response() {
        let transport = MockTransport::new();
        transport.register_json(HttpMethod::Get, "http://census/api/a", 200, &json!({"ok": true}));

        let response = transport.send(get("http://census/api/a")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), r#"{"ok":true}"#);
        assert_eq!(transport.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_method_is_part_of_the_key() {
        let transport = MockTransport::new();
        transport.register_response(HttpMethod::Post, "http://census/api/a", 201, "");

        let err = transport.send(get("http://census/api/a")).await.unwrap_err();
        assert!(err.to_string().contains("no mock registered for GET"));
    }

    #[tokio::test]
    async fn test_query_falls_back_to_base_url() {
        let transport = MockTransport::new();
        transport.register_response(HttpMethod::Get, "http://census/api/search", 200, "[]");

        let response = transport
            .send(get("http://census/api/search?name=John+Smith"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            transport.last_request().unwrap().url,
            "http://census/api/search?name=John+Smith"
        );
    }

    #[tokio::test]
    async fn test_timeout_and_error_routes() {
        let transport = MockTransport::new();
        transport.register_timeout(HttpMethod::Get, "http://slow/");
        transport.register_error(HttpMethod::Get, "http://down/", "refused");

        assert!(transport.send(get("http://slow/")).await.unwrap_err().is_timeout());
        let err = transport.send(get("http://down/")).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));

        assert_eq!(transport.dispatch_count(), 2);
        transport.clear_requests();
        assert_eq!(transport.dispatch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let transport = MockTransport::new().with_latency(Duration::from_millis(50));
        transport.register_response(HttpMethod::Get, "http://census/", 200, "");

        let start = tokio::time::Instant::now();
        transport.send(get("http://census/")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
