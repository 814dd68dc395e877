//! Endpoint registry.
//!
//! The [`EndpointRegistry`] maps logical endpoint keys such as
//! `"census.get_customer"` to [`EndpointContract`]s. Registration normally
//! happens once at startup while lookups happen on every outbound call, so
//! the registry is guarded by a reader-writer lock: reads share, writes are
//! serialized.
//!
//! Keys are unique. Registering a key twice fails instead of overwriting.

use crate::contract::EndpointContract;
use crate::error::{ServiceError, ServiceResult};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<EndpointRegistry> = OnceLock::new();

/// Lookup table from logical endpoint keys to contracts.
///
/// Cloning is cheap and clones share the same table.
///
/// # Example
///
/// ```
/// use meridian_core::{EndpointContract, EndpointRegistry};
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
///
/// assert!(registry.has("census.get_customer"));
/// assert_eq!(registry.get("census.get_customer").unwrap().service(), "census");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    entries: Arc<RwLock<IndexMap<String, Arc<EndpointContract>>>>,
}

impl EndpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    ///
    /// This exists for convenience only; prefer constructing a registry and
    /// passing it to the components that need it.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Registers a contract under `key`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EmptyEndpointKey`] if `key` is empty
    /// - [`ServiceError::DuplicateKey`] if `key` is already registered
    pub fn register(&self, key: impl Into<String>, contract: EndpointContract) -> ServiceResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(ServiceError::EmptyEndpointKey);
        }

        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(ServiceError::DuplicateKey { keys: vec![key] });
        }
        tracing::debug!(endpoint = %key, service = %contract.service(), "Registered endpoint");
        entries.insert(key, Arc::new(contract));
        Ok(())
    }

    /// Registers every entry, or none of them.
    ///
    /// All keys are checked (against the registry and against each other)
    /// before anything is inserted.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EmptyEndpointKey`] if any key is empty
    /// - [`ServiceError::DuplicateKey`] listing every colliding key
    pub fn bulk_register<K>(
        &self,
        entries: impl IntoIterator<Item = (K, EndpointContract)>,
    ) -> ServiceResult<()>
    where
        K: Into<String>,
    {
        let batch: Vec<(String, EndpointContract)> = entries
            .into_iter()
            .map(|(key, contract)| (key.into(), contract))
            .collect();

        if batch.iter().any(|(key, _)| key.is_empty()) {
            return Err(ServiceError::EmptyEndpointKey);
        }

        let mut table = self.entries.write();
        let mut seen = HashSet::with_capacity(batch.len());
        let mut conflicts = Vec::new();
        for (key, _) in &batch {
            if (table.contains_key(key) || !seen.insert(key.as_str()))
                && !conflicts.contains(key)
            {
                conflicts.push(key.clone());
            }
        }
        if !conflicts.is_empty() {
            return Err(ServiceError::DuplicateKey { keys: conflicts });
        }

        let count = batch.len();
        table.extend(
            batch
                .into_iter()
                .map(|(key, contract)| (key, Arc::new(contract))),
        );
        tracing::debug!(count, "Registered endpoints");
        Ok(())
    }

    /// Returns the contract registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EndpointNotFound`] if `key` is not registered.
    pub fn get(&self, key: &str) -> ServiceResult<Arc<EndpointContract>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::endpoint_not_found(key, entries.keys().cloned().collect()))
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns every registered key, in registration order.
    #[must_use]
    pub fn list_keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns the keys whose contract belongs to `service`, in registration order.
    #[must_use]
    pub fn list_by_service(&self, service: &str) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|(_, contract)| contract.service() == service)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Removes `key`. Returns whether a contract was removed.
    ///
    /// Removing an absent key is a no-op.
    pub fn unregister(&self, key: &str) -> bool {
        self.entries.write().shift_remove(key).is_some()
    }

    /// Removes every contract.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::HttpMethod;
    use crate::error::ServiceErrorKind;

    fn contract(service: &str, path: &str) -> EndpointContract {
        EndpointContract::builder(service, path).build().unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = EndpointRegistry::new();
        registry
            .register("census.get_customer", contract("census", "/api/customers/{id}"))
            .unwrap();

        let found = registry.get("census.get_customer").unwrap();
        assert_eq!(found.service(), "census");
        assert_eq!(found.method(), HttpMethod::Get);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_empty_key() {
        let registry = EndpointRegistry::new();
        let err = registry.register("", contract("census", "/api")).unwrap_err();
        assert!(matches!(err, ServiceError::EmptyEndpointKey));
    }

    #[test]
    fn test_register_duplicate_key() {
        let registry = EndpointRegistry::new();
        registry.register("census.list", contract("census", "/a")).unwrap();
        let err = registry
            .register("census.list", contract("census", "/b"))
            .unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::DuplicateKey);
        // First registration is untouched
        assert_eq!(registry.get("census.list").unwrap().path_template(), "/a");
    }

    #[test]
    fn test_get_missing_lists_available() {
        let registry = EndpointRegistry::new();
        registry.register("census.list", contract("census", "/a")).unwrap();
        match registry.get("orders.list").unwrap_err() {
            ServiceError::EndpointNotFound { key, available } => {
                assert_eq!(key, "orders.list");
                assert_eq!(available, vec!["census.list".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bulk_register() {
        let registry = EndpointRegistry::new();
        registry
            .bulk_register([
                ("census.list", contract("census", "/a")),
                ("orders.list", contract("orders", "/b")),
            ])
            .unwrap();
        assert_eq!(registry.list_keys(), vec!["census.list", "orders.list"]);
    }

    #[test]
    fn test_bulk_register_is_atomic_on_existing_key() {
        let registry = EndpointRegistry::new();
        registry.register("census.list", contract("census", "/a")).unwrap();

        let err = registry
            .bulk_register([
                ("orders.list", contract("orders", "/b")),
                ("census.list", contract("census", "/c")),
            ])
            .unwrap_err();

        match err {
            ServiceError::DuplicateKey { keys } => assert_eq!(keys, vec!["census.list"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!registry.has("orders.list"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_bulk_register_is_atomic_on_duplicate_in_batch() {
        let registry = EndpointRegistry::new();
        let err = registry
            .bulk_register([
                ("orders.list", contract("orders", "/a")),
                ("orders.list", contract("orders", "/b")),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ServiceErrorKind::DuplicateKey);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bulk_register_rejects_empty_key() {
        let registry = EndpointRegistry::new();
        let result = registry.bulk_register([
            ("orders.list", contract("orders", "/a")),
            ("", contract("orders", "/b")),
        ]);
        assert!(matches!(result, Err(ServiceError::EmptyEndpointKey)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_by_service_preserves_order() {
        let registry = EndpointRegistry::new();
        registry.register("census.b", contract("census", "/b")).unwrap();
        registry.register("orders.a", contract("orders", "/a")).unwrap();
        registry.register("census.a", contract("census", "/a")).unwrap();

        assert_eq!(registry.list_by_service("census"), vec!["census.b", "census.a"]);
        assert!(registry.list_by_service("billing").is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = EndpointRegistry::new();
        registry.register("census.list", contract("census", "/a")).unwrap();

        assert!(registry.unregister("census.list"));
        assert!(!registry.unregister("census.list"));
        assert!(!registry.has("census.list"));
    }

    #[test]
    fn test_clear() {
        let registry = EndpointRegistry::new();
        registry.register("census.list", contract("census", "/a")).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.list_keys().is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let registry = EndpointRegistry::new();
        let clone = registry.clone();
        registry.register("census.list", contract("census", "/a")).unwrap();
        assert!(clone.has("census.list"));
    }

    #[test]
    fn test_global_is_a_single_instance() {
        let first = EndpointRegistry::global();
        let second = EndpointRegistry::global();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let registry = EndpointRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry
                        .register(format!("svc.op{i}"), contract("svc", "/op"))
                        .unwrap();
                    registry.list_keys().len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        assert_eq!(registry.len(), 8);
    }
}
