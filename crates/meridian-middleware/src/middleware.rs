//! Core middleware trait and types.
//!
//! A [`Middleware`] receives the mutable context, the request and a [`Next`]
//! continuation. It may act before and after calling `next.run()`, or return
//! its own response without calling it.
//!
//! # Example
//!
//! ```
//! use meridian_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "Request finished");
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The function a pipeline ends in.
pub type Handler<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a>;

/// A stage shared between pipelines.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A pipeline stage.
///
/// Call `next.run()` at most once. Returning without calling it
/// short-circuits the remaining stages and the handler.
pub trait Middleware: Send + Sync + 'static {
    /// Stage name for logs and [`Pipeline::stage_names`](crate::Pipeline::stage_names).
    fn name(&self) -> &'static str;

    /// Runs this stage.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// The stages still to run, followed by the handler.
pub struct Next<'a> {
    remaining: &'a [BoxedMiddleware],
    handler: Handler<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(remaining: &'a [BoxedMiddleware], handler: Handler<'a>) -> Self {
        Self { remaining, handler }
    }

    /// A continuation with no stages left, only `f`.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self::new(&[], Box::new(f))
    }

    /// Stages left before the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Hands the request to the next stage, or to the handler once the
    /// stages are exhausted.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> Response {
        let Self { remaining, handler } = self;
        match remaining.split_first() {
            Some((stage, rest)) => stage.process(ctx, request, Next::new(rest, handler)).await,
            None => handler(ctx, request).await,
        }
    }
}
