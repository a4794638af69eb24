//! The method registry: holds [`ServiceContract`]s and resolves
//! `(service, method)` lookups during dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{MethodContract, ServiceContract};

/// Errors raised while registering services and methods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("service already registered: {0}")]
    DuplicateService(String),
    #[error("duplicate method {service}/{method}")]
    DuplicateMethod { service: String, method: String },
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("method not found: {service}/{method}")]
    MethodNotFound { service: String, method: String },
}

/// Holds contract metadata, handlers, and codecs, keyed by `(service,
/// method)`.
///
/// Registration happens before the endpoint begins serving; lookups after
/// that point are read-only, so an `RwLock` keeps read-mostly lookups cheap
/// even though in practice nothing ever contends on it once `serve` starts.
#[derive(Default)]
pub struct Registry {
    services: RwLock<HashMap<String, Arc<ServiceContract>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every method of `contract` under its service name. Fails
    /// with [`RegistryError::DuplicateService`] if the name is already
    /// taken.
    pub fn register_service(&self, contract: ServiceContract) -> Result<(), RegistryError> {
        let mut services = self.services.write();
        if services.contains_key(&contract.name) {
            return Err(RegistryError::DuplicateService(contract.name));
        }
        services.insert(contract.name.clone(), Arc::new(contract));
        Ok(())
    }

    pub fn lookup(&self, service: &str, method: &str) -> Option<Arc<MethodContract>> {
        let services = self.services.read();
        services.get(service)?.lookup(method)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonCodec, MethodMetadata};

    fn trivial_service(name: &str) -> ServiceContract {
        ServiceContract::define(name, |svc| {
            svc.unary::<i32, i32, JsonCodec, JsonCodec, _, _>(
                "Noop",
                MethodMetadata::default(),
                |_req| async move { unreachable!() },
            );
        })
    }

    #[test]
    fn rejects_duplicate_service_names() {
        let registry = Registry::new();
        registry.register_service(trivial_service("Svc")).unwrap();
        let err = registry
            .register_service(trivial_service("Svc"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateService("Svc".to_string()));
    }

    #[test]
    fn lookup_misses_return_none() {
        let registry = Registry::new();
        registry.register_service(trivial_service("Svc")).unwrap();
        assert!(registry.lookup("Svc", "DoesNotExist").is_none());
        assert!(registry.lookup("Other", "Noop").is_none());
        assert!(registry.lookup("Svc", "Noop").is_some());
    }

    #[test]
    #[should_panic(expected = "duplicate method name")]
    fn rejects_duplicate_method_names_within_a_service() {
        ServiceContract::define("Svc", |svc| {
            svc.unary::<i32, i32, JsonCodec, JsonCodec, _, _>(
                "Same",
                MethodMetadata::default(),
                |_req| async move { unreachable!() },
            );
            svc.unary::<i32, i32, JsonCodec, JsonCodec, _, _>(
                "Same",
                MethodMetadata::default(),
                |_req| async move { unreachable!() },
            );
        });
    }
}
