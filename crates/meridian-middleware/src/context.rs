//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline.
//! [`TraceMiddleware`](crate::TraceMiddleware) fills in the trace and peer
//! fields; later stages and the handler read them.

use meridian_core::headers::UNKNOWN_PEER;
use meridian_core::TraceId;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use meridian_core::TraceId;
/// use meridian_middleware::context::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// assert_eq!(ctx.peer_service(), "unknown");
///
/// ctx.set_trace_id(TraceId::parse("UICALL.C32PO").unwrap());
/// assert_eq!(ctx.trace_id().map(TraceId::as_str), Some("UICALL.C32PO"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Trace id received from the caller.
    inbound_trace_id: Option<TraceId>,

    /// Trace id assigned to this request.
    trace_id: Option<TraceId>,

    /// Name of the calling service.
    peer_service: String,

    /// Dotted name of the requested path.
    url_name: Option<String>,

    started_at: Instant,

    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inbound_trace_id: None,
            trace_id: None,
            peer_service: UNKNOWN_PEER.to_string(),
            url_name: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the trace id received from the caller, if any.
    #[must_use]
    pub fn inbound_trace_id(&self) -> Option<&TraceId> {
        self.inbound_trace_id.as_ref()
    }

    /// Sets the trace id received from the caller.
    pub fn set_inbound_trace_id(&mut self, trace_id: Option<TraceId>) {
        self.inbound_trace_id = trace_id;
    }

    /// Returns this request's trace id, if assigned.
    #[must_use]
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    /// Sets this request's trace id.
    pub fn set_trace_id(&mut self, trace_id: TraceId) {
        self.trace_id = Some(trace_id);
    }

    /// Returns the calling service's name.
    #[must_use]
    pub fn peer_service(&self) -> &str {
        &self.peer_service
    }

    /// Sets the calling service's name.
    pub fn set_peer_service(&mut self, peer: impl Into<String>) {
        self.peer_service = peer.into();
    }

    /// Returns the dotted path name used in telemetry.
    #[must_use]
    pub fn url_name(&self) -> Option<&str> {
        self.url_name.as_deref()
    }

    /// Sets the dotted path name used in telemetry.
    pub fn set_url_name(&mut self, url_name: impl Into<String>) {
        self.url_name = Some(url_name.into());
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
