//! Fixtures for client tests.

use std::sync::Arc;

use indexmap::IndexMap;
use meridian_client::ServiceClient;
use meridian_config::{ServiceSettings, ServiceUrlResolver};
use meridian_core::{EndpointContract, EndpointRegistry, ServiceResult};
use serde_json::Value;

use crate::sink::RecordingSink;
use crate::transport::MockTransport;

/// Settings for `service_name` that know the given `(service, base_url)` pairs.
pub fn settings_with_services(service_name: &str, services: &[(&str, &str)]) -> ServiceSettings {
    services
        .iter()
        .fold(ServiceSettings::new(service_name), |settings, (name, url)| {
            settings.with_service(name, url)
        })
}

/// Registers a mock response for the endpoint `key` and returns its URL.
///
/// The URL is built from the resolver's base URL and the contract's path
/// template, the same way [`ServiceClient`] builds it.
///
/// # Errors
///
/// Fails if `key` is not registered, its service has no base URL, or a path
/// placeholder has no value in `path_params`.
pub fn mock_endpoint(
    transport: &MockTransport,
    resolver: &ServiceUrlResolver,
    registry: &EndpointRegistry,
    key: &str,
    path_params: &[(&str, &str)],
    status: u16,
    json: &Value,
) -> ServiceResult<String> {
    let contract = registry.get(key)?;
    let base_url = resolver.get_base_url(contract.service())?;
    let params: IndexMap<String, String> = path_params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let url = format!("{base_url}{}", contract.render_path(key, &params)?);

    transport.register_json(contract.method(), url.clone(), status, json);
    Ok(url)
}

/// A [`ServiceClient`] wired to a [`MockTransport`] and a [`RecordingSink`].
///
/// ```
/// use meridian_core::{EndpointContract, HttpMethod};
/// use meridian_test::ClientHarness;
///
/// let harness = ClientHarness::new("orders", &[("census", "http://census:8001")]);
/// harness.register(
///     "census.get_customer",
///     EndpointContract::builder("census", "/api/customers/{customer_id}")
///         .build()
///         .unwrap(),
/// );
/// assert!(harness.registry.has("census.get_customer"));
/// ```
#[derive(Debug, Clone)]
pub struct ClientHarness {
    /// Endpoint registry used by the client.
    pub registry: EndpointRegistry,
    /// URL resolver used by the client.
    pub resolver: ServiceUrlResolver,
    /// Transport the client dispatches through.
    pub transport: MockTransport,
    /// Sink receiving the client's telemetry.
    pub sink: RecordingSink,
    /// The client under test.
    pub client: ServiceClient,
}

impl ClientHarness {
    /// Creates a harness for `service_name` calling the given services.
    pub fn new(service_name: &str, services: &[(&str, &str)]) -> Self {
        Self::with_settings(settings_with_services(service_name, services))
    }

    /// Creates a harness from prepared settings.
    pub fn with_settings(settings: ServiceSettings) -> Self {
        let registry = EndpointRegistry::new();
        let resolver = ServiceUrlResolver::new(settings);
        let transport = MockTransport::new();
        let sink = RecordingSink::new();
        let client = ServiceClient::builder(registry.clone(), resolver.clone())
            .transport(Arc::new(transport.clone()))
            .emitter(sink.emitter("meridian.client"))
            .build()
            .expect("client with mock transport");

        Self {
            registry,
            resolver,
            transport,
            sink,
            client,
        }
    }

    /// Registers a contract.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty or already registered.
    pub fn register(&self, key: &str, contract: EndpointContract) {
        self.registry
            .register(key, contract)
            .expect("endpoint registration");
    }

    /// Mocks a JSON response for `key`. See [`mock_endpoint`].
    ///
    /// # Panics
    ///
    /// Panics if the URL cannot be built.
    pub fn mock(&self, key: &str, path_params: &[(&str, &str)], status: u16, json: &Value) -> String {
        mock_endpoint(
            &self.transport,
            &self.resolver,
            &self.registry,
            key,
            path_params,
            status,
            json,
        )
        .expect("mock endpoint URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_settings_with_services() {
        let settings = settings_with_services(
            "orders",
            &[("Census", "http://census:8001/"), ("billing", "http://billing")],
        );
        assert_eq!(settings.service_name, "orders");
        assert_eq!(settings.services["census"], "http://census:8001");
        assert_eq!(settings.services.len(), 2);
    }

    #[test]
    fn test_mock_endpoint_builds_client_url() {
        let harness = ClientHarness::new("orders", &[("census", "http://census:8001")]);
        harness.register(
            "census.update_customer",
            EndpointContract::builder("census", "/api/customers/{customer_id}")
                .method(HttpMethod::Put)
                .build()
                .unwrap(),
        );

        let url = harness.mock(
            "census.update_customer",
            &[("customer_id", "7")],
            200,
            &json!({"id": "7"}),
        );
        assert_eq!(url, "http://census:8001/api/customers/7");
    }

    #[test]
    fn test_mock_endpoint_unknown_key() {
        let harness = ClientHarness::new("orders", &[]);
        let result = mock_endpoint(
            &harness.transport,
            &harness.resolver,
            &harness.registry,
            "census.nope",
            &[],
            200,
            &Value::Null,
        );
        assert!(result.is_err());
    }
}
