//! The contract-driven service client.
//!
//! A call names a logical endpoint key. The client looks up the contract,
//! resolves the target's base URL, renders the path, validates the body,
//! attaches trace headers, dispatches through its [`Transport`] and
//! classifies the outcome into a [`ServiceError`]. Every call reports
//! telemetry:
//!
//! | Outcome | Events |
//! |---|---|
//! | success | `http.client.request`, `http.client.response` |
//! | failure after dispatch | `http.client.request`, `http.client.error` |
//! | failure before dispatch | `http.client.error` (`duration_ms` 0) |

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use meridian_config::{ConfigError, ServiceUrlResolver};
use meridian_core::headers::{PropagatedHeaders, UNKNOWN_PEER};
use meridian_core::{
    EndpointContract, EndpointRegistry, ServiceError, ServiceResult, TraceContext,
};
use meridian_telemetry::metrics::record_client_call;
use meridian_telemetry::{Exchange, TelemetryEmitter};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::params::{build_url, Params};
use crate::transport::{
    OutboundRequest, ReqwestTransport, Transport, TransportError, TransportResponse,
};

/// Logger name used when no emitter is supplied.
pub const DEFAULT_LOGGER: &str = "meridian.client";

/// Maximum number of characters of an error body kept in [`ServiceError::Http`].
pub const ERROR_BODY_LIMIT: usize = 500;

const APPLICATION_JSON: &str = "application/json";

/// Client for calling other services by logical endpoint key.
///
/// Cloning is cheap; clones share the registry, resolver and transport.
///
/// # Example
///
/// ```rust,ignore
/// use meridian_client::{Params, ServiceClient};
///
/// let client = ServiceClient::builder(registry, resolver).build()?;
///
/// let customer: Customer = client
///     .get("census.get_customer", Params::new().path("customer_id", 123))
///     .await?;
/// ```
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<Inner>,
}

struct Inner {
    service_name: String,
    registry: EndpointRegistry,
    resolver: ServiceUrlResolver,
    transport: Arc<dyn Transport>,
    emitter: TelemetryEmitter,
    default_timeout: Duration,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service_name", &self.inner.service_name)
            .field("default_timeout", &self.inner.default_timeout)
            .field("endpoints", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

/// Why [`ServiceClientBuilder::build`] failed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The resolver's settings hold no usable default timeout.
    #[error("invalid client settings: {0}")]
    Settings(#[from] ConfigError),

    /// The default transport could not be created.
    #[error("cannot create transport: {0}")]
    Transport(#[from] TransportError),
}

/// Builder for [`ServiceClient`].
#[must_use]
pub struct ServiceClientBuilder {
    registry: EndpointRegistry,
    resolver: ServiceUrlResolver,
    service_name: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    emitter: Option<TelemetryEmitter>,
    default_timeout: Option<Duration>,
}

impl ServiceClientBuilder {
    /// Sets the name sent as `X-Service-Name`.
    ///
    /// Defaults to the resolver's `service_name` setting.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the transport. Defaults to [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the telemetry emitter.
    pub fn emitter(mut self, emitter: TelemetryEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Sets the timeout for contracts without their own.
    ///
    /// Defaults to the resolver's `http.timeout_secs` setting.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Settings` if no default timeout was given and
    /// the settings' `http.timeout_secs` is not a positive number, and
    /// `BuildError::Transport` if the default transport cannot be created.
    pub fn build(self) -> Result<ServiceClient, BuildError> {
        let settings = self.resolver.settings();
        let default_timeout = match self.default_timeout {
            Some(timeout) => timeout,
            None => settings.http.timeout()?,
        };
        let service_name = self
            .service_name
            .unwrap_or_else(|| settings.service_name.clone());
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(ServiceClient {
            inner: Arc::new(Inner {
                service_name,
                registry: self.registry,
                resolver: self.resolver,
                transport,
                emitter: self
                    .emitter
                    .unwrap_or_else(|| TelemetryEmitter::new(DEFAULT_LOGGER)),
                default_timeout,
            }),
        })
    }
}

impl ServiceClient {
    /// Creates a builder over an endpoint registry and a URL resolver.
    pub fn builder(registry: EndpointRegistry, resolver: ServiceUrlResolver) -> ServiceClientBuilder {
        ServiceClientBuilder {
            registry,
            resolver,
            service_name: None,
            transport: None,
            emitter: None,
            default_timeout: None,
        }
    }

    /// This service's own name.
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Timeout for contracts without their own.
    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// The endpoint registry.
    pub fn registry(&self) -> &EndpointRegistry {
        &self.inner.registry
    }

    /// The URL resolver.
    pub fn resolver(&self) -> &ServiceUrlResolver {
        &self.inner.resolver
    }

    /// Calls a `GET` endpoint. The contract's method is what is sent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, params: Params) -> ServiceResult<T> {
        self.request(key, params).await
    }

    /// Calls a `POST` endpoint. The contract's method is what is sent.
    pub async fn post<T: DeserializeOwned>(&self, key: &str, params: Params) -> ServiceResult<T> {
        self.request(key, params).await
    }

    /// Calls a `PUT` endpoint. The contract's method is what is sent.
    pub async fn put<T: DeserializeOwned>(&self, key: &str, params: Params) -> ServiceResult<T> {
        self.request(key, params).await
    }

    /// Calls a `DELETE` endpoint. The contract's method is what is sent.
    pub async fn delete<T: DeserializeOwned>(&self, key: &str, params: Params) -> ServiceResult<T> {
        self.request(key, params).await
    }

    /// Calls a `PATCH` endpoint. The contract's method is what is sent.
    pub async fn patch<T: DeserializeOwned>(&self, key: &str, params: Params) -> ServiceResult<T> {
        self.request(key, params).await
    }

    /// Calls an endpoint and returns the decoded JSON body.
    ///
    /// An empty response body yields `None`.
    pub async fn request_value(&self, key: &str, params: Params) -> ServiceResult<Option<Value>> {
        self.request(key, params).await
    }

    /// Calls an endpoint and deserializes the response into `T`.
    ///
    /// An empty response body is decoded as JSON `null`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EndpointNotFound`] if `key` is not registered
    /// - [`ServiceError::ServiceNotConfigured`] if the target has no base URL
    /// - [`ServiceError::MissingPathParameter`] if a placeholder has no value
    /// - [`ServiceError::RequestValidation`] if the body fails the request shape
    /// - [`ServiceError::NotFound`], [`ServiceError::Unavailable`] or
    ///   [`ServiceError::Http`] for 404, 5xx and other 4xx responses
    /// - [`ServiceError::Timeout`] or [`ServiceError::Transport`] for
    ///   transport failures
    /// - [`ServiceError::ResponseValidation`] or [`ServiceError::ResponseDecode`]
    ///   if the response body is not what the contract or `T` expects
    pub async fn request<T: DeserializeOwned>(
        &self,
        key: &str,
        params: Params,
    ) -> ServiceResult<T> {
        let contract = match self.inner.registry.get(key) {
            Ok(contract) => contract,
            Err(err) => {
                let exchange = Exchange::new(key, UNKNOWN_PEER, UNKNOWN_PEER);
                return Err(self.fail_before_dispatch(&exchange, err));
            }
        };
        let exchange = Exchange::new(key, contract.service(), contract.method().as_str());

        let prepared = match self.prepare(key, &contract, params) {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.fail_before_dispatch(&exchange, err)),
        };
        let url = prepared.url.clone();

        self.inner.emitter.client_request(&exchange, &url);

        let start = Instant::now();
        let outcome = self.inner.transport.send(prepared).await;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        let result = match outcome {
            Ok(response) => {
                let status = response.status;
                classify(key, &url, &contract, response)
                    .map(|value| (status, value))
                    .map_err(|err| (Some(status), err))
            }
            Err(err) => Err((
                None,
                transport_failure(key, &url, &contract, self.inner.default_timeout, err),
            )),
        };

        match result {
            Ok((status, value)) => {
                self.inner
                    .emitter
                    .client_response(&exchange, status, duration_ms);
                record_client_call(contract.service(), key, "success", elapsed);
                Ok(value)
            }
            Err((status, err)) => {
                self.inner.emitter.client_error(
                    &exchange,
                    &err.to_string(),
                    err.error_type(),
                    duration_ms,
                    status,
                );
                record_client_call(contract.service(), key, err.error_type(), elapsed);
                Err(err)
            }
        }
    }

    /// Steps 2 to 6: everything that can fail before the request leaves.
    fn prepare(
        &self,
        key: &str,
        contract: &EndpointContract,
        mut params: Params,
    ) -> ServiceResult<OutboundRequest> {
        let base_url = self.inner.resolver.get_base_url(contract.service())?;
        let path = contract.render_path(key, params.path_params())?;

        for name in params.path_params().keys() {
            if !contract.placeholders().any(|p| p == name.as_str()) {
                tracing::debug!(endpoint = %key, param = %name, "Ignoring unused path parameter");
            }
        }

        let body = params.take_body();
        if let (Some(body), Some(shape)) = (&body, contract.request_shape()) {
            shape
                .validate(body)
                .map_err(|source| ServiceError::RequestValidation {
                    endpoint: key.to_string(),
                    source,
                })?;
        }

        let url = build_url(&base_url, &path, params.query_params());
        let timeout = contract.effective_timeout(self.inner.default_timeout);
        let mut request = OutboundRequest::new(contract.method(), url, timeout);

        let json = HeaderValue::from_static(APPLICATION_JSON);
        request.headers.insert(CONTENT_TYPE, json.clone());
        request.headers.insert(ACCEPT, json);
        PropagatedHeaders::new(&self.inner.service_name)
            .with_trace_id(TraceContext::current())
            .add_to_headers(&mut request.headers);

        match body {
            Some(body) if contract.method().carries_body() => {
                let encoded = serde_json::to_vec(&body)
                    .map_err(|e| ServiceError::transport(key, format!("failed to encode body: {e}")))?;
                request.body = Some(Bytes::from(encoded));
            }
            Some(_) => {
                tracing::debug!(
                    endpoint = %key,
                    method = %contract.method(),
                    "Body not sent for a method without a request body"
                );
            }
            None => {}
        }

        Ok(request)
    }

    fn fail_before_dispatch(&self, exchange: &Exchange, err: ServiceError) -> ServiceError {
        self.inner
            .emitter
            .client_error(exchange, &err.to_string(), err.error_type(), 0, None);
        record_client_call(
            &exchange.peer_service,
            &exchange.url_name,
            err.error_type(),
            Duration::ZERO,
        );
        err
    }
}

/// Maps a response to the decoded body or the matching error.
fn classify<T: DeserializeOwned>(
    key: &str,
    url: &str,
    contract: &EndpointContract,
    response: TransportResponse,
) -> ServiceResult<T> {
    match response.status {
        404 => {
            tracing::warn!(endpoint = %key, %url, "Resource not found");
            return Err(ServiceError::NotFound {
                endpoint: key.to_string(),
                url: url.to_string(),
            });
        }
        status if status >= 500 => {
            return Err(ServiceError::Unavailable {
                endpoint: key.to_string(),
                url: url.to_string(),
                status,
            });
        }
        status if status >= 400 => {
            return Err(ServiceError::Http {
                endpoint: key.to_string(),
                url: url.to_string(),
                status,
                body: response.body_text().chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }
        _ => {}
    }

    if response.body.is_empty() {
        return serde_json::from_value(Value::Null).map_err(|e| ServiceError::ResponseDecode {
            endpoint: key.to_string(),
            message: e.to_string(),
        });
    }

    let value: Value =
        serde_json::from_slice(&response.body).map_err(|e| ServiceError::ResponseDecode {
            endpoint: key.to_string(),
            message: e.to_string(),
        })?;

    if let Some(shape) = contract.response_shape() {
        shape
            .validate(&value)
            .map_err(|source| ServiceError::ResponseValidation {
                endpoint: key.to_string(),
                source,
            })?;
    }

    serde_json::from_value(value).map_err(|e| ServiceError::ResponseDecode {
        endpoint: key.to_string(),
        message: e.to_string(),
    })
}

fn transport_failure(
    key: &str,
    url: &str,
    contract: &EndpointContract,
    default_timeout: Duration,
    err: TransportError,
) -> ServiceError {
    match err {
        TransportError::Timeout => ServiceError::Timeout {
            endpoint: key.to_string(),
            url: url.to_string(),
            timeout: contract.effective_timeout(default_timeout),
        },
        other => ServiceError::transport_with_source(key, url, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{HttpMethod, Shape};
    use serde_json::json;

    fn contract() -> EndpointContract {
        EndpointContract::builder("census", "/api/customers/{customer_id}")
            .response_shape(Shape::object([("id", Shape::string().required())]))
            .build()
            .unwrap()
    }

    #[test]
    fn test_classify_success() {
        let response = TransportResponse::new(200, r#"{"id":"123","name":"John"}"#);
        let value: Value = classify("census.get_customer", "u", &contract(), response).unwrap();
        assert_eq!(value, json!({"id": "123", "name": "John"}));
    }

    #[test]
    fn test_classify_empty_body_is_null() {
        let contract = EndpointContract::builder("census", "/api/customers")
            .method(HttpMethod::Delete)
            .build()
            .unwrap();
        let value: Option<Value> =
            classify("census.delete", "u", &contract, TransportResponse::new(204, "")).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_classify_statuses() {
        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(404, "")).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(503, "")).unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { status: 503, .. }));

        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(500, "")).unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { status: 500, .. }));

        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(422, "bad"))
            .unwrap_err();
        match err {
            ServiceError::Http { status, body, .. } => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_truncates_error_body() {
        let long = "x".repeat(2000);
        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(400, long))
            .unwrap_err();
        match err {
            ServiceError::Http { body, .. } => assert_eq!(body.chars().count(), ERROR_BODY_LIMIT),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_response_shape_violation() {
        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(200, r#"{"id":1}"#))
            .unwrap_err();
        assert!(matches!(err, ServiceError::ResponseValidation { .. }));
    }

    #[test]
    fn test_classify_invalid_json() {
        let err = classify::<Value>("k", "u", &contract(), TransportResponse::new(200, "<html>"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::ResponseDecode { .. }));
    }

    #[test]
    fn test_classify_type_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        struct Customer {
            #[allow(dead_code)]
            id: String,
            #[allow(dead_code)]
            name: String,
        }

        let err = classify::<Customer>("k", "u", &contract(), TransportResponse::new(200, r#"{"id":"1"}"#))
            .unwrap_err();
        assert!(matches!(err, ServiceError::ResponseDecode { .. }));
    }

    #[test]
    fn test_transport_failure_mapping() {
        let timeout = transport_failure(
            "k",
            "u",
            &contract(),
            Duration::from_secs(10),
            TransportError::Timeout,
        );
        assert!(matches!(
            timeout,
            ServiceError::Timeout { timeout, .. } if timeout == Duration::from_secs(10)
        ));

        let connect = transport_failure(
            "k",
            "u",
            &contract(),
            Duration::from_secs(10),
            TransportError::connect("refused"),
        );
        assert_eq!(connect.error_type(), "ServiceError");
        assert!(std::error::Error::source(&connect).is_some());
    }

    #[test]
    fn test_transport_failure_keeps_cause_chain() {
        let err = transport_failure(
            "census.get_customer",
            "http://census:8001/api/customers/1",
            &contract(),
            Duration::from_secs(10),
            TransportError::Connect {
                message: "connection refused".to_string(),
                source: Some(anyhow::anyhow!("tcp connect error: os error 111")),
            },
        );

        let transport = std::error::Error::source(&err).unwrap();
        assert_eq!(transport.to_string(), "connection failed: connection refused");
        let cause = transport.source().unwrap();
        assert_eq!(cause.to_string(), "tcp connect error: os error 111");
    }
}
