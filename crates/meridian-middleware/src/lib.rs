//! # Meridian Middleware
//!
//! Server boundary for the Meridian invocation layer.
//!
//! A [`Pipeline`] runs each inbound request through an ordered list of
//! [`Middleware`] stages before the handler. [`TraceMiddleware`] is the
//! stage every service installs first:
//!
//! ```text
//! Request → TraceMiddleware → (your stages) → Handler
//!              │ X-Trace-ID + segment, scope opened
//!              │ http.server.request
//!              ▼
//! Response ← X-Trace-ID ← http.server.error? ← http.server.response
//! ```
//!
//! Inside the handler, [`TraceContext::current`](meridian_core::TraceContext::current)
//! returns the incremented id, so a `ServiceClient` call made there forwards
//! it to the next service.
//!
//! Handlers report failure by attaching a [`HandlerFailure`] to the
//! response, usually through [`ResponseExt::failure`] or
//! [`ResponseExt::from_service_error`].

#![doc(html_root_url = "https://docs.rs/meridian-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod trace;
pub mod types;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, BoxedMiddleware, Handler, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use trace::{url_name_for, TraceMiddleware};
pub use types::{HandlerFailure, Request, Response, ResponseExt};
