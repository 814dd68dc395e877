//! Ordered middleware pipeline.
//!
//! Stages run in the order they were added; the handler runs last and its
//! response travels back through the stages in reverse.

use std::sync::Arc;

use meridian_telemetry::TelemetryEmitter;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, BoxedMiddleware, Middleware, Next};
use crate::trace::TraceMiddleware;
use crate::types::{Request, Response};

/// An immutable, ordered list of middleware stages.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use meridian_middleware::{Pipeline, Response, ResponseExt};
/// use meridian_telemetry::TelemetryEmitter;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::traced(TelemetryEmitter::new("orders.server"));
///
/// let request = http::Request::builder()
///     .uri("/api/orders")
///     .header("x-trace-id", "UICALL")
///     .body(Full::new(Bytes::new()))
///     .unwrap();
///
/// let response = pipeline
///     .handle(request, |_ctx, _req| {
///         Box::pin(async { Response::text(http::StatusCode::OK, "ok") })
///     })
///     .await;
///
/// let trace_id = response.headers()["x-trace-id"].to_str().unwrap();
/// assert!(trace_id.starts_with("UICALL."));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Creates a pipeline whose only stage is [`TraceMiddleware`].
    #[must_use]
    pub fn traced(emitter: TelemetryEmitter) -> Self {
        Self::builder().stage(TraceMiddleware::new(emitter)).build()
    }

    /// Runs a request through every stage and then `handler`.
    pub async fn process<H>(&self, mut ctx: MiddlewareContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        Next::new(&self.stages, Box::new(handler))
            .run(&mut ctx, request)
            .await
    }

    /// Runs a request with a fresh [`MiddlewareContext`].
    pub async fn handle<H>(&self, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        self.process(MiddlewareContext::new(), request, handler).await
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
#[must_use]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a shared stage.
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}
