//! Service catalog collaborator: where published services are read from.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;

use marketplace_catalog::{Service, ServiceId};
use marketplace_core::{DomainError, DomainResult};

/// Read access to published services.
pub trait ServiceCatalog: Send + Sync {
    fn service(&self, id: ServiceId) -> DomainResult<Option<Service>>;
}

impl<C> ServiceCatalog for Arc<C>
where
    C: ServiceCatalog + ?Sized,
{
    fn service(&self, id: ServiceId) -> DomainResult<Option<Service>> {
        (**self).service(id)
    }
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryServiceCatalog {
    services: RwLock<HashMap<ServiceId, Service>>,
    default_currency: Option<String>,
}

impl InMemoryServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currency given to loaded documents that do not name one.
    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.default_currency = Some(currency.to_string());
        self
    }

    /// Publish (or replace) a service.
    pub fn insert(&self, service: Service) -> DomainResult<()> {
        let mut services = self
            .services
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        services.insert(service.id_typed(), service);
        Ok(())
    }

    /// Load listing documents (a JSON array of service records).
    ///
    /// All-or-nothing: a malformed record leaves the catalog untouched.
    pub fn load_documents(&self, documents: &JsonValue) -> DomainResult<usize> {
        let records = documents
            .as_array()
            .ok_or_else(|| DomainError::validation("service listing must be a JSON array"))?;

        let parsed = records
            .iter()
            .map(|record| -> DomainResult<Service> {
                let service = Service::from_document(record)?;
                Ok(match (&self.default_currency, record.get("currency")) {
                    (Some(currency), None) => service.with_currency(currency),
                    _ => service,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let count = parsed.len();
        for service in parsed {
            self.insert(service)?;
        }
        tracing::debug!(count, "loaded service listings");
        Ok(count)
    }
}

impl ServiceCatalog for InMemoryServiceCatalog {
    fn service(&self, id: ServiceId) -> DomainResult<Option<Service>> {
        let services = self
            .services
            .read()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        Ok(services.get(&id).cloned())
    }
}
