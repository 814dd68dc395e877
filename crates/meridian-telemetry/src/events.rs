//! The six canonical HTTP telemetry events.
//!
//! Every service in the fleet reports the same events with the same field
//! names, so dashboards and log queries work across services:
//!
//! | Event | `direction` | Variant fields | Level |
//! |---|---|---|---|
//! | `http.client.request` | outbound | `url` | INFO |
//! | `http.client.response` | inbound | `status_code`, `duration_ms` | ERROR if status >= 400, else INFO |
//! | `http.client.error` | inbound | `error`, `error_type`, `duration_ms` | ERROR |
//! | `http.server.request` | inbound | `path` | INFO |
//! | `http.server.response` | outbound | `status_code`, `duration_ms` | ERROR if status >= 400, else INFO |
//! | `http.server.error` | outbound | `error`, `error_type` | ERROR |
//!
//! Every event also carries `name`, `direction`, `peer_service`, `method`
//! and `url_name`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::Level;

/// Field names reserved by the event contract.
pub const RESERVED_FIELDS: &[&str] = &[
    "name",
    "direction",
    "peer_service",
    "method",
    "url_name",
    "url",
    "path",
    "status_code",
    "duration_ms",
    "error",
    "error_type",
];

/// Canonical event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// An outbound call is about to be dispatched.
    #[serde(rename = "http.client.request")]
    ClientRequest,
    /// An outbound call completed with a response.
    #[serde(rename = "http.client.response")]
    ClientResponse,
    /// An outbound call failed.
    #[serde(rename = "http.client.error")]
    ClientError,
    /// An inbound request arrived.
    #[serde(rename = "http.server.request")]
    ServerRequest,
    /// An inbound request was answered.
    #[serde(rename = "http.server.response")]
    ServerResponse,
    /// Handling an inbound request failed.
    #[serde(rename = "http.server.error")]
    ServerError,
}

impl EventName {
    /// Returns the dotted event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientRequest => "http.client.request",
            Self::ClientResponse => "http.client.response",
            Self::ClientError => "http.client.error",
            Self::ServerRequest => "http.server.request",
            Self::ServerResponse => "http.server.response",
            Self::ServerError => "http.server.error",
        }
    }

    /// Returns the traffic direction this event describes.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::ClientRequest | Self::ServerResponse | Self::ServerError => Direction::Outbound,
            Self::ClientResponse | Self::ClientError | Self::ServerRequest => Direction::Inbound,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the traffic an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Traffic arriving at this service.
    Inbound,
    /// Traffic leaving this service.
    Outbound,
}

/// The fields shared by all events of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Logical endpoint identifier, e.g. `census.get_customer`.
    pub url_name: String,
    /// The other party of the exchange.
    pub peer_service: String,
    /// HTTP method.
    pub method: String,
}

impl Exchange {
    /// Creates an exchange description.
    #[must_use]
    pub fn new(
        url_name: impl Into<String>,
        peer_service: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            url_name: url_name.into(),
            peer_service: peer_service.into(),
            method: method.into(),
        }
    }
}

/// One telemetry event, serialized as the `data` object of a log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    /// Event name.
    pub name: EventName,
    /// Traffic direction.
    pub direction: Direction,
    /// The other party of the exchange.
    pub peer_service: String,
    /// HTTP method.
    pub method: String,
    /// Logical endpoint identifier.
    pub url_name: String,
    /// Full request URL (`http.client.request`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request path (`http.server.request`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Response status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Elapsed wall-clock time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Additional caller-supplied fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TelemetryEvent {
    /// Creates an event with only the common fields set.
    #[must_use]
    pub fn new(name: EventName, exchange: &Exchange) -> Self {
        Self {
            name,
            direction: name.direction(),
            peer_service: exchange.peer_service.clone(),
            method: exchange.method.clone(),
            url_name: exchange.url_name.clone(),
            url: None,
            path: None,
            status_code: None,
            duration_ms: None,
            error: None,
            error_type: None,
            extra: Map::new(),
        }
    }

    /// `http.client.request`
    #[must_use]
    pub fn client_request(exchange: &Exchange, url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::new(EventName::ClientRequest, exchange)
        }
    }

    /// `http.client.response`
    #[must_use]
    pub fn client_response(exchange: &Exchange, status_code: u16, duration_ms: u64) -> Self {
        Self {
            status_code: Some(status_code),
            duration_ms: Some(duration_ms),
            ..Self::new(EventName::ClientResponse, exchange)
        }
    }

    /// `http.client.error`
    #[must_use]
    pub fn client_error(
        exchange: &Exchange,
        error: impl Into<String>,
        error_type: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            error: Some(error.into()),
            error_type: Some(error_type.into()),
            duration_ms: Some(duration_ms),
            ..Self::new(EventName::ClientError, exchange)
        }
    }

    /// `http.server.request`
    #[must_use]
    pub fn server_request(exchange: &Exchange, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new(EventName::ServerRequest, exchange)
        }
    }

    /// `http.server.response`
    #[must_use]
    pub fn server_response(exchange: &Exchange, status_code: u16, duration_ms: u64) -> Self {
        Self {
            status_code: Some(status_code),
            duration_ms: Some(duration_ms),
            ..Self::new(EventName::ServerResponse, exchange)
        }
    }

    /// `http.server.error`
    #[must_use]
    pub fn server_error(
        exchange: &Exchange,
        error: impl Into<String>,
        error_type: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            error_type: Some(error_type.into()),
            ..Self::new(EventName::ServerError, exchange)
        }
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Adds an extra field to `data`.
    ///
    /// Reserved field names are ignored so the fixed contract cannot be
    /// overridden.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            tracing::debug!(field = %key, "Ignoring reserved telemetry field");
        } else {
            self.extra.insert(key, value.into());
        }
        self
    }

    /// Severity the event is logged at.
    #[must_use]
    pub fn level(&self) -> Level {
        match self.name {
            EventName::ClientRequest | EventName::ServerRequest => Level::INFO,
            EventName::ClientResponse | EventName::ServerResponse => {
                if self.status_code.is_some_and(|s| s >= 400) {
                    Level::ERROR
                } else {
                    Level::INFO
                }
            }
            EventName::ClientError | EventName::ServerError => Level::ERROR,
        }
    }

    /// Encodes the event as the `data` JSON object.
    pub fn to_data(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exchange() -> Exchange {
        Exchange::new("census.get_customer", "census", "GET")
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventName::ClientRequest.as_str(), "http.client.request");
        assert_eq!(EventName::ServerError.to_string(), "http.server.error");
        assert_eq!(
            serde_json::to_value(EventName::ServerResponse).unwrap(),
            json!("http.server.response")
        );
    }

    #[test]
    fn test_directions() {
        assert_eq!(EventName::ClientRequest.direction(), Direction::Outbound);
        assert_eq!(EventName::ClientResponse.direction(), Direction::Inbound);
        assert_eq!(EventName::ClientError.direction(), Direction::Inbound);
        assert_eq!(EventName::ServerRequest.direction(), Direction::Inbound);
        assert_eq!(EventName::ServerResponse.direction(), Direction::Outbound);
        assert_eq!(EventName::ServerError.direction(), Direction::Outbound);
    }

    #[test]
    fn test_client_request_data() {
        let data = TelemetryEvent::client_request(&exchange(), "http://localhost:8001/api/customers/1")
            .to_data()
            .unwrap();
        assert_eq!(
            data,
            json!({
                "name": "http.client.request",
                "direction": "outbound",
                "peer_service": "census",
                "method": "GET",
                "url_name": "census.get_customer",
                "url": "http://localhost:8001/api/customers/1"
            })
        );
    }

    #[test]
    fn test_client_response_data() {
        let data = TelemetryEvent::client_response(&exchange(), 200, 12)
            .to_data()
            .unwrap();
        assert_eq!(data["status_code"], 200);
        assert_eq!(data["duration_ms"], 12);
        assert_eq!(data["direction"], "inbound");
        assert!(data.get("error").is_none());
    }

    #[test]
    fn test_server_error_data() {
        let data = TelemetryEvent::server_error(&exchange(), "boom", "HandlerError")
            .to_data()
            .unwrap();
        assert_eq!(data["name"], "http.server.error");
        assert_eq!(data["direction"], "outbound");
        assert_eq!(data["error"], "boom");
        assert_eq!(data["error_type"], "HandlerError");
    }

    #[test]
    fn test_levels() {
        assert_eq!(
            TelemetryEvent::client_request(&exchange(), "u").level(),
            Level::INFO
        );
        assert_eq!(
            TelemetryEvent::client_response(&exchange(), 204, 1).level(),
            Level::INFO
        );
        assert_eq!(
            TelemetryEvent::server_response(&exchange(), 404, 1).level(),
            Level::ERROR
        );
        assert_eq!(
            TelemetryEvent::client_error(&exchange(), "e", "T", 1).level(),
            Level::ERROR
        );
    }

    #[test]
    fn test_extra_fields_merge_into_data() {
        let data = TelemetryEvent::server_request(&exchange(), "/api/customers/1")
            .with_field("request_size", 42)
            .with_field("status_code", 999)
            .to_data()
            .unwrap();
        assert_eq!(data["request_size"], 42);
        assert!(data.get("status_code").is_none());
    }
}
