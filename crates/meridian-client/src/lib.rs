//! # Meridian Client
//!
//! Contract-driven HTTP client for calling other services.
//!
//! Callers name an endpoint by its logical key (`"census.get_customer"`)
//! instead of building URLs. The [`ServiceClient`] looks up the
//! [`EndpointContract`](meridian_core::EndpointContract), resolves the
//! target's base URL through [`ServiceUrlResolver`](meridian_config::ServiceUrlResolver),
//! propagates `X-Trace-ID` and `X-Service-Name`, and emits the client-side
//! telemetry events.
//!
//! ## Example
//!
//! ```rust,ignore
//! use meridian_client::{Params, ServiceClient};
//! use meridian_config::{ServiceSettings, ServiceUrlResolver};
//! use meridian_core::EndpointRegistry;
//!
//! let settings = ServiceSettings::new("orders").with_service("census", "http://census:8001");
//! let client = ServiceClient::builder(
//!     EndpointRegistry::global().clone(),
//!     ServiceUrlResolver::new(settings),
//! )
//! .build()?;
//!
//! let customer: Customer = client
//!     .get("census.get_customer", Params::new().path("customer_id", 123))
//!     .await?;
//! ```

#![doc(html_root_url = "https://docs.rs/meridian-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod params;
pub mod transport;

pub use client::{BuildError, ServiceClient, ServiceClientBuilder, DEFAULT_LOGGER, ERROR_BODY_LIMIT};
pub use params::{build_url, Params};
pub use transport::{
    BoxFuture, OutboundRequest, ReqwestTransport, Transport, TransportError, TransportResponse,
};
