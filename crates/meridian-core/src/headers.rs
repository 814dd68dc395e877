//! Header names and helpers for trace propagation.
//!
//! Two headers cross every service boundary:
//!
//! | Header | Outbound request | Inbound request | Response |
//! |---|---|---|---|
//! | `X-Trace-ID` | current id, unincremented | read and incremented by the receiver | receiver's incremented id |
//! | `X-Service-Name` | caller's own service name | peer name for server telemetry | - |

use crate::trace::TraceId;
use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Header name for the trace id.
pub static HEADER_TRACE_ID: HeaderName = HeaderName::from_static("x-trace-id");

/// Header name for the calling service's name.
pub static HEADER_SERVICE_NAME: HeaderName = HeaderName::from_static("x-service-name");

/// Peer name used when a request carries no `X-Service-Name`.
pub const UNKNOWN_PEER: &str = "unknown";

/// Headers attached to every outbound service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagatedHeaders {
    /// Trace id to forward, if one is set.
    pub trace_id: Option<TraceId>,
    /// Name of the calling service.
    pub service_name: String,
}

impl PropagatedHeaders {
    /// Creates propagated headers for `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            trace_id: None,
            service_name: service_name.into(),
        }
    }

    /// Sets the trace id to forward.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: Option<TraceId>) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Writes the headers into `headers`, replacing existing values.
    ///
    /// A service name that is not a valid header value is skipped.
    pub fn add_to_headers(&self, headers: &mut HeaderMap) {
        if let Some(ref trace_id) = self.trace_id {
            // Trace ids are validated ASCII, so this cannot fail
            if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
                headers.insert(HEADER_TRACE_ID.clone(), value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&self.service_name) {
            headers.insert(HEADER_SERVICE_NAME.clone(), value);
        }
    }
}

/// Reads the inbound trace id.
///
/// A missing header yields `None`. A header that is not a valid trace id is
/// logged and also yields `None`, so the receiver starts a fresh chain.
pub fn extract_trace_id(headers: &HeaderMap) -> Option<TraceId> {
    let raw = headers.get(&HEADER_TRACE_ID)?;
    let parsed = raw
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|s| TraceId::parse(s.trim()).map_err(|e| e.to_string()));

    match parsed {
        Ok(id) => Some(id),
        Err(reason) => {
            tracing::warn!(header = ?raw, %reason, "Ignoring malformed trace id header");
            None
        }
    }
}

/// Reads the calling service's name, defaulting to [`UNKNOWN_PEER`].
pub fn extract_peer_service(headers: &HeaderMap) -> String {
    headers
        .get(&HEADER_SERVICE_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_PEER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names() {
        assert_eq!(HEADER_TRACE_ID.as_str(), "x-trace-id");
        assert_eq!(HEADER_SERVICE_NAME.as_str(), "x-service-name");
    }

    #[test]
    fn test_add_to_headers() {
        let mut headers = HeaderMap::new();
        PropagatedHeaders::new("orders")
            .with_trace_id(Some(TraceId::parse("UICALL.C32PO").unwrap()))
            .add_to_headers(&mut headers);

        assert_eq!(headers.get(&HEADER_TRACE_ID).unwrap(), "UICALL.C32PO");
        assert_eq!(headers.get(&HEADER_SERVICE_NAME).unwrap(), "orders");
    }

    #[test]
    fn test_add_to_headers_without_trace() {
        let mut headers = HeaderMap::new();
        PropagatedHeaders::new("orders").add_to_headers(&mut headers);
        assert!(headers.get(&HEADER_TRACE_ID).is_none());
        assert_eq!(headers.get(&HEADER_SERVICE_NAME).unwrap(), "orders");
    }

    #[test]
    fn test_extract_trace_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_trace_id(&headers), None);

        headers.insert(HEADER_TRACE_ID.clone(), HeaderValue::from_static("UICALL.C32PO"));
        assert_eq!(
            extract_trace_id(&headers).unwrap().as_str(),
            "UICALL.C32PO"
        );
    }

    #[test]
    fn test_extract_malformed_trace_id_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_TRACE_ID.clone(), HeaderValue::from_static("A..B"));
        assert_eq!(extract_trace_id(&headers), None);
    }

    #[test]
    fn test_extract_peer_service() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_peer_service(&headers), "unknown");

        headers.insert(HEADER_SERVICE_NAME.clone(), HeaderValue::from_static("orders"));
        assert_eq!(extract_peer_service(&headers), "orders");

        headers.insert(HEADER_SERVICE_NAME.clone(), HeaderValue::from_static("  "));
        assert_eq!(extract_peer_service(&headers), "unknown");
    }
}
