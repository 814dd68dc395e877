//! # Meridian Test
//!
//! Test utilities for services built on Meridian. Nothing here opens a
//! socket.
//!
//! ## Outbound calls
//!
//! - [`MockTransport`] answers `ServiceClient` requests from registered
//!   routes and records what was sent
//! - [`RecordingSink`] captures telemetry events for exact-count assertions
//! - [`ClientHarness`] wires both to a client, and [`mock_endpoint`]
//!   registers a response at the URL the client will build
//!
//! ```
//! use meridian_core::EndpointContract;
//! use meridian_telemetry::EventName;
//! use meridian_test::ClientHarness;
//! use serde_json::{json, Value};
//!
//! # tokio_test::block_on(async {
//! let harness = ClientHarness::new("orders", &[("census", "http://census:8001")]);
//! harness.register(
//!     "census.get_customer",
//!     EndpointContract::builder("census", "/api/customers/{customer_id}").build().unwrap(),
//! );
//! harness.mock("census.get_customer", &[("customer_id", "123")], 200, &json!({"id": "123"}));
//!
//! let customer: Value = harness
//!     .client
//!     .get("census.get_customer", meridian_client::Params::new().path("customer_id", 123))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(customer["id"], "123");
//! assert_eq!(harness.sink.count(EventName::ClientResponse), 1);
//! # });
//! ```
//!
//! ## Inbound requests
//!
//! [`TestServer`] runs [`TestRequest`]s through a traced middleware
//! pipeline and returns [`TestResponse`]s with assertion helpers.

#![doc(html_root_url = "https://docs.rs/meridian-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod fixtures;
mod request;
mod response;
mod server;
mod sink;
mod transport;

pub use error::TestError;
pub use fixtures::{mock_endpoint, settings_with_services, ClientHarness};
pub use request::TestRequest;
pub use response::TestResponse;
pub use server::TestServer;
pub use sink::RecordingSink;
pub use transport::MockTransport;
