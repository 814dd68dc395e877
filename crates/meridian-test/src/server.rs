//! In-memory server for middleware tests.

use std::future::Future;
use std::sync::Arc;

use meridian_middleware::{
    BoxFuture, MiddlewareContext, Pipeline, Request, Response, TraceMiddleware,
};

use crate::error::TestError;
use crate::request::TestRequest;
use crate::response::TestResponse;
use crate::sink::RecordingSink;

type SharedHandler =
    Arc<dyn Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Runs requests through a traced [`Pipeline`] without binding a port.
///
/// Server telemetry goes to [`TestServer::sink`].
///
/// ```
/// use http::StatusCode;
/// use meridian_middleware::{Response, ResponseExt};
/// use meridian_telemetry::EventName;
/// use meridian_test::{TestRequest, TestServer};
///
/// # tokio_test::block_on(async {
/// let server = TestServer::new(|_ctx, _req| async { Response::text(StatusCode::OK, "ok") });
///
/// let response = server.send(TestRequest::get("/health")).await.unwrap();
/// response.assert_status_code(200);
/// assert_eq!(server.sink.count(EventName::ServerResponse), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct TestServer {
    pipeline: Pipeline,
    handler: SharedHandler,
    /// Sink receiving the server's telemetry.
    pub sink: RecordingSink,
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl TestServer {
    /// Creates a server whose pipeline holds only [`TraceMiddleware`].
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let sink = RecordingSink::new();
        let pipeline = Pipeline::builder()
            .stage(TraceMiddleware::new(sink.emitter("meridian.server")).without_metrics())
            .build();
        Self::with_pipeline(pipeline, sink, handler)
    }

    /// Creates a server around a prepared pipeline.
    ///
    /// `sink` is exposed as [`TestServer::sink`]; it only receives events if
    /// the pipeline's stages report to it.
    pub fn with_pipeline<F, Fut>(pipeline: Pipeline, sink: RecordingSink, handler: F) -> Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: SharedHandler = Arc::new(
            move |ctx: &mut MiddlewareContext, req: Request| -> BoxFuture<'static, Response> {
                Box::pin(handler(ctx, req))
            },
        );
        Self {
            pipeline,
            handler,
            sink,
        }
    }

    /// Sends a request through the pipeline and collects the response.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let request = request.build()?;
        let handler = Arc::clone(&self.handler);
        let response = self
            .pipeline
            .handle(request, move |ctx, req| handler(ctx, req))
            .await;
        TestResponse::from_response(response).await
    }
}
