//! Call parameters and URL assembly.

use std::fmt::Display;

use indexmap::IndexMap;
use serde_json::Value;

/// Path parameters, query parameters and body of one call.
///
/// # Example
///
/// ```
/// use meridian_client::Params;
/// use serde_json::json;
///
/// let params = Params::new()
///     .path("customer_id", 123)
///     .query("include", "orders")
///     .body(json!({"name": "John"}));
///
/// assert_eq!(params.path_params()["customer_id"], "123");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    path: IndexMap<String, String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl Params {
    /// Empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a path parameter, replacing any earlier value.
    #[must_use]
    pub fn path(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.path.insert(name.into(), value.to_string());
        self
    }

    /// Appends a query parameter. Repeated names are kept in order.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Path parameters.
    pub fn path_params(&self) -> &IndexMap<String, String> {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// The JSON body, if set.
    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub(crate) fn take_body(&mut self) -> Option<Value> {
        self.body.take()
    }
}

/// Joins a base URL, a rendered path and form-encoded query parameters.
///
/// The path is appended verbatim; only the query is encoded.
///
/// ```
/// use meridian_client::build_url;
///
/// let url = build_url(
///     "http://census:8001",
///     "/api/customers",
///     &[("name".to_string(), "John Smith".to_string())],
/// );
/// assert_eq!(url, "http://census:8001/api/customers?name=John+Smith");
/// ```
pub fn build_url(base_url: &str, path: &str, query: &[(String, String)]) -> String {
    let mut url = format!("{base_url}{path}");
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .finish();
        url.push(if path.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_builder() {
        let params = Params::new()
            .path("customer_id", 42)
            .path("customer_id", "43")
            .query("tag", "a")
            .query("tag", "b")
            .body(json!({"x": 1}));

        assert_eq!(params.path_params().len(), 1);
        assert_eq!(params.path_params()["customer_id"], "43");
        assert_eq!(
            params.query_params(),
            &[
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string())
            ]
        );
        assert_eq!(params.body_value(), Some(&json!({"x": 1})));
    }

    #[test]
    fn test_build_url_without_query() {
        assert_eq!(
            build_url("http://localhost:8001", "/api/customers/123", &[]),
            "http://localhost:8001/api/customers/123"
        );
    }

    #[test]
    fn test_build_url_encodes_query_only() {
        let url = build_url(
            "http://localhost:8001",
            "/api/files/a b",
            &[
                ("q".to_string(), "x&y=z".to_string()),
                ("page".to_string(), "2".to_string()),
            ],
        );
        assert_eq!(url, "http://localhost:8001/api/files/a b?q=x%26y%3Dz&page=2");
    }

    #[test]
    fn test_build_url_with_existing_query() {
        let url = build_url(
            "http://localhost:8001",
            "/api/search?v=1",
            &[("q".to_string(), "rust".to_string())],
        );
        assert_eq!(url, "http://localhost:8001/api/search?v=1&q=rust");
    }
}
