//! Loading services from stored listing documents.
//!
//! Listing records are flat JSON objects whose localized attributes appear as
//! `field` plus `field_<lang>` keys:
//!
//! ```json
//! { "id": "…", "owner_id": "…", "title": "Logo design", "title_ar": "…",
//!   "price": "$1,500", "delivery_time": "3 days", "features": ["…"],
//!   "packages": [{ "name": "Basic", "price": 500, "is_popular": true }] }
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use marketplace_core::{AggregateId, DomainError, DomainResult, UserId};

use crate::localized::{Blank, Localized};
use crate::money::PriceInput;
use crate::service::{Package, Service, ServiceId};

impl Service {
    pub fn from_document(document: &JsonValue) -> DomainResult<Self> {
        let record = as_record(document, "service")?;

        let id: AggregateId = required_str(record, "id")?.parse()?;
        let owner: UserId = required_str(record, "owner_id")?.parse()?;
        let title = localized::<String>(record, "title")?
            .ok_or_else(|| DomainError::validation("service document is missing 'title'"))?;

        let mut service = Service::new(ServiceId::new(id), owner, title)
            .with_description(localized(record, "description")?.unwrap_or_default())
            .with_category(localized(record, "category")?.unwrap_or_default())
            .with_tags(localized(record, "tags")?.unwrap_or_default())
            .with_delivery_time(localized(record, "delivery_time")?.unwrap_or_default())
            .with_features(localized(record, "features")?.unwrap_or_default())
            .with_revisions(optional(record, "revisions")?.unwrap_or(0));

        if let Some(price) = optional::<PriceInput>(record, "price")? {
            service = service.with_price(price);
        }
        if let Some(currency) = optional::<String>(record, "currency")? {
            service = service.with_currency(&currency);
        }

        let packages = optional::<Vec<JsonValue>>(record, "packages")?.unwrap_or_default();
        for package in &packages {
            service = service.with_package(Package::from_document(package)?);
        }

        Ok(service)
    }
}

impl Package {
    pub fn from_document(document: &JsonValue) -> DomainResult<Self> {
        let record = as_record(document, "package")?;

        Ok(Package {
            name: required_str(record, "name")?.to_string(),
            price: optional(record, "price")?
                .ok_or_else(|| DomainError::validation("package document is missing 'price'"))?,
            delivery_time: localized(record, "delivery_time")?.unwrap_or_default(),
            revisions: optional(record, "revisions")?.unwrap_or(0),
            features: localized(record, "features")?.unwrap_or_default(),
            is_popular: optional(record, "is_popular")?.unwrap_or(false),
        })
    }
}

fn as_record<'a>(document: &'a JsonValue, what: &str) -> DomainResult<&'a Map<String, JsonValue>> {
    document
        .as_object()
        .ok_or_else(|| DomainError::validation(format!("{what} document must be a JSON object")))
}

fn required_str<'a>(record: &'a Map<String, JsonValue>, key: &str) -> DomainResult<&'a str> {
    record
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| DomainError::validation(format!("missing string field '{key}'")))
}

fn optional<T: DeserializeOwned>(record: &Map<String, JsonValue>, key: &str) -> DomainResult<Option<T>> {
    match record.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| DomainError::validation(format!("field '{key}': {e}"))),
    }
}

fn localized<T: Blank + DeserializeOwned>(
    record: &Map<String, JsonValue>,
    key: &str,
) -> DomainResult<Option<Localized<T>>> {
    Localized::from_suffixed_fields(record, key)
}
