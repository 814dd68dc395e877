//! # Meridian
//!
//! **Traced, contract-driven calls between services**
//!
//! Meridian gives every service the same outbound and inbound plumbing:
//!
//! - **Endpoint contracts** – callers name an endpoint by key
//!   (`census.get_customer`); method, path template, shapes and timeout come
//!   from a shared registry
//! - **Base URL resolution** – per-environment service URLs from settings
//! - **Incremental trace ids** – each receiving hop appends one segment to
//!   `X-Trace-ID`, so the id records the whole call chain
//! - **Uniform telemetry** – six structured events with fixed names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meridian::prelude::*;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConfigLoader::new()
//!         .with_defaults()
//!         .with_optional_file("meridian.toml")?
//!         .with_env_prefix("MERIDIAN")
//!         .with_base_url_env()
//!         .load()?;
//!
//!     let registry = EndpointRegistry::global();
//!     registry.register(
//!         "census.get_customer",
//!         EndpointContract::builder("census", "/api/customers/{customer_id}").build()?,
//!     )?;
//!
//!     let client = ServiceClient::builder(registry.clone(), ServiceUrlResolver::new(settings))
//!         .build()?;
//!
//!     let customer: Value = client
//!         .get("census.get_customer", Params::new().path("customer_id", 123))
//!         .await?;
//!     println!("{customer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! inbound ──▶ TraceMiddleware ──▶ handler ──▶ ServiceClient ──▶ peer
//!   X-Trace-ID: A     (scope: A.B)               X-Trace-ID: A.B
//!                                                X-Service-Name: <self>
//! ```

#![doc(html_root_url = "https://docs.rs/meridian/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use meridian_core as core;

// Re-export settings and URL resolution
pub use meridian_config as config;

// Re-export telemetry
pub use meridian_telemetry as telemetry;

// Re-export the outbound client
pub use meridian_client as client;

// Re-export server middleware
pub use meridian_middleware as middleware;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use meridian::prelude::*;
///
/// let registry = EndpointRegistry::new();
/// registry
///     .register(
///         "census.get_customer",
///         EndpointContract::builder("census", "/api/customers/{customer_id}")
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
/// assert!(registry.has("census.get_customer"));
/// ```
pub mod prelude {
    pub use meridian_core::{
        spawn_with_trace, EndpointContract, EndpointRegistry, HttpMethod, ServiceError,
        ServiceErrorKind, ServiceResult, Shape, TraceContext, TraceId,
    };

    // Settings and resolution
    pub use meridian_config::{ConfigLoader, Environment, ServiceSettings, ServiceUrlResolver};

    // Telemetry
    pub use meridian_telemetry::{
        init_logging, EventName, TelemetryEmitter, TelemetryEvent, TelemetrySink,
    };

    // Outbound calls
    pub use meridian_client::{Params, ServiceClient, Transport};

    // Inbound requests
    pub use meridian_middleware::{
        Middleware, MiddlewareContext, Pipeline, ResponseExt, TraceMiddleware,
    };
}
