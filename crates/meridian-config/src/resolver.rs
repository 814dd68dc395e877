//! Service base URL resolution.

use std::collections::HashMap;
use std::sync::Arc;

use meridian_core::{ServiceError, ServiceResult};
use parking_lot::RwLock;

use crate::ServiceSettings;

/// Maps logical service names to base URLs.
///
/// Lookups are case-insensitive and memoized. Clones share the settings and
/// the cache.
///
/// # Example
///
/// ```
/// use meridian_config::{ServiceSettings, ServiceUrlResolver};
///
/// let resolver = ServiceUrlResolver::new(
///     ServiceSettings::new("orders").with_service("census", "http://census:8001"),
/// );
///
/// assert_eq!(resolver.get_base_url("Census").unwrap(), "http://census:8001");
/// assert!(resolver.get_base_url("billing").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceUrlResolver {
    settings: Arc<ServiceSettings>,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl ServiceUrlResolver {
    /// Creates a resolver over `settings`.
    ///
    /// Service names and base URLs are normalized first.
    #[must_use]
    pub fn new(mut settings: ServiceSettings) -> Self {
        settings.normalize();
        Self {
            settings: Arc::new(settings),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the base URL of `service`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ServiceNotConfigured`], listing the configured
    /// services, if `service` has no base URL.
    pub fn get_base_url(&self, service: &str) -> ServiceResult<String> {
        let name = service.to_lowercase();

        if let Some(url) = self.cache.read().get(&name) {
            tracing::debug!(service = %name, "Base URL cache hit");
            return Ok(url.clone());
        }

        let Some(url) = self.settings.services.get(&name) else {
            return Err(ServiceError::service_not_configured(
                service,
                self.list_services(),
            ));
        };

        tracing::debug!(service = %name, base_url = %url, "Resolved base URL");
        self.cache.write().insert(name, url.clone());
        Ok(url.clone())
    }

    /// Returns the configured service names, sorted.
    #[must_use]
    pub fn list_services(&self) -> Vec<String> {
        self.settings.services.keys().cloned().collect()
    }

    /// Drops every memoized lookup.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// The settings this resolver reads from.
    #[must_use]
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::ServiceErrorKind;

    fn resolver() -> ServiceUrlResolver {
        ServiceUrlResolver::new(
            ServiceSettings::new("orders")
                .with_service("census", "http://localhost:8001")
                .with_service("billing", "https://billing.internal/"),
        )
    }

    #[test]
    fn test_get_base_url() {
        let resolver = resolver();
        assert_eq!(resolver.get_base_url("census").unwrap(), "http://localhost:8001");
        assert_eq!(
            resolver.get_base_url("billing").unwrap(),
            "https://billing.internal"
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let resolver = resolver();
        assert_eq!(resolver.get_base_url("CENSUS").unwrap(), "http://localhost:8001");
        assert_eq!(resolver.cached(), 1);
        assert_eq!(resolver.get_base_url("census").unwrap(), "http://localhost:8001");
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn test_not_configured_lists_available() {
        let err = resolver().get_base_url("inventory").unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::ServiceNotConfigured);
        match err {
            ServiceError::ServiceNotConfigured {
                service,
                available_services,
            } => {
                assert_eq!(service, "inventory");
                assert_eq!(available_services, vec!["billing", "census"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_configured_with_no_services() {
        let resolver = ServiceUrlResolver::new(ServiceSettings::new("orders"));
        let err = resolver.get_base_url("census").unwrap_err();
        assert!(err.to_string().contains("available services: none"));
    }

    #[test]
    fn test_list_services_sorted() {
        assert_eq!(resolver().list_services(), vec!["billing", "census"]);
    }

    #[test]
    fn test_clear_cache() {
        let resolver = resolver();
        resolver.get_base_url("census").unwrap();
        resolver.get_base_url("billing").unwrap();
        assert_eq!(resolver.cached(), 2);

        resolver.clear_cache();
        assert_eq!(resolver.cached(), 0);
        assert_eq!(resolver.get_base_url("census").unwrap(), "http://localhost:8001");
    }

    #[test]
    fn test_new_normalizes_manual_settings() {
        let mut settings = ServiceSettings::new("orders");
        settings
            .services
            .insert("Census".to_string(), "http://localhost:8001/".to_string());
        let resolver = ServiceUrlResolver::new(settings);
        assert_eq!(resolver.get_base_url("census").unwrap(), "http://localhost:8001");
        assert_eq!(resolver.settings().service_name, "orders");
    }

    #[test]
    fn test_concurrent_lookups() {
        let resolver = resolver();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = resolver.clone();
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "census" } else { "billing" };
                    for _ in 0..100 {
                        resolver.get_base_url(name).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(resolver.cached(), 2);
    }
}
