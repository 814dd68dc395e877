//! Server side of the trace-id protocol.
//!
//! For every inbound request [`TraceMiddleware`]:
//!
//! 1. reads `X-Trace-ID` and appends a fresh segment (or starts a new chain)
//! 2. reads `X-Service-Name` as the peer, defaulting to `unknown`
//! 3. runs the rest of the pipeline inside a [`TraceContext`] scope holding
//!    the new id, so outbound calls and log records see it
//! 4. emits `http.server.request`, then `http.server.error` if the handler
//!    attached a [`HandlerFailure`](crate::HandlerFailure), then
//!    `http.server.response`
//! 5. returns the new id in the response's `X-Trace-ID`

use std::time::Instant;

use http::HeaderValue;
use meridian_core::headers::{extract_peer_service, extract_trace_id, HEADER_TRACE_ID};
use meridian_core::{TraceContext, TraceId};
use meridian_telemetry::metrics::{record_server_request, InFlightGuard};
use meridian_telemetry::{Exchange, TelemetryEmitter};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Name used for the request path `/`.
pub const ROOT_URL_NAME: &str = "root";

/// Derives the telemetry `url_name` from a request path.
///
/// ```
/// use meridian_middleware::trace::url_name_for;
///
/// assert_eq!(url_name_for("/api/customers/123"), "api.customers.123");
/// assert_eq!(url_name_for("/"), "root");
/// ```
pub fn url_name_for(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        ROOT_URL_NAME.to_string()
    } else {
        trimmed.replace('/', ".")
    }
}

/// Middleware that assigns the request's trace id and reports server
/// telemetry.
#[derive(Debug, Clone)]
pub struct TraceMiddleware {
    emitter: TelemetryEmitter,
    record_metrics: bool,
}

impl TraceMiddleware {
    /// Creates the middleware, reporting through `emitter`.
    #[must_use]
    pub fn new(emitter: TelemetryEmitter) -> Self {
        Self {
            emitter,
            record_metrics: true,
        }
    }

    /// Disables the request counter, latency histogram and in-flight gauge.
    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        self.record_metrics = false;
        self
    }
}

impl Default for TraceMiddleware {
    fn default() -> Self {
        Self::new(TelemetryEmitter::default())
    }
}

impl Middleware for TraceMiddleware {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let inbound = extract_trace_id(request.headers());
            let trace_id = TraceId::increment(inbound.as_ref());
            let peer_service = extract_peer_service(request.headers());
            let path = request.uri().path().to_string();
            let url_name = url_name_for(&path);

            ctx.set_inbound_trace_id(inbound);
            ctx.set_trace_id(trace_id.clone());
            ctx.set_peer_service(peer_service.clone());
            ctx.set_url_name(url_name.clone());

            let exchange = Exchange::new(url_name, peer_service, request.method().as_str());

            TraceContext::scope(Some(trace_id.clone()), async move {
                let _in_flight = self.record_metrics.then(InFlightGuard::new);
                let start = Instant::now();

                self.emitter.server_request(&exchange, &path);

                let mut response = next.run(ctx, request).await;
                let elapsed = start.elapsed();
                let status = response.status().as_u16();

                if let Some(failure) = response.handler_failure() {
                    self.emitter
                        .server_error(&exchange, &failure.error, &failure.error_type);
                }
                self.emitter
                    .server_response(&exchange, status, elapsed.as_millis() as u64);

                if self.record_metrics {
                    record_server_request(&exchange.url_name, status, elapsed);
                }

                if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
                    response.headers_mut().insert(HEADER_TRACE_ID.clone(), value);
                }
                response
            })
            .await
        })
    }
}
