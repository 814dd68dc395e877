//! # Meridian Core
//!
//! Core types for the Meridian cross-service invocation layer.
//!
//! This crate provides the pieces every other Meridian crate builds on:
//!
//! - [`EndpointContract`] - Immutable description of one callable endpoint
//! - [`EndpointRegistry`] - Logical key to contract lookup table
//! - [`Shape`] - JSON shape validator for request and response bodies
//! - [`TraceId`] / [`TraceContext`] - The incremental trace-ID protocol
//! - [`ServiceError`] - The typed error taxonomy for service calls

#![doc(html_root_url = "https://docs.rs/meridian-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
mod error;
pub mod headers;
pub mod registry;
pub mod shape;
pub mod trace;

pub use contract::{EndpointContract, EndpointContractBuilder, HttpMethod};
pub use error::{ServiceError, ServiceErrorKind, ServiceResult};
pub use registry::EndpointRegistry;
pub use shape::{Shape, ShapeError};
pub use trace::{
    spawn_with_trace, TraceContext, TraceId, TraceIdParseError, TraceScopeError, MAX_DEPTH,
    MAX_TRACE_ID_LEN,
};
