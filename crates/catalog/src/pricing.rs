//! Package/price resolution.
//!
//! Turns a service plus an optional package name into the priced line an order
//! snapshots. Selection order: exact package name, then the first package
//! flagged popular, then the first package. Services without packages are
//! priced from their own base attributes.

use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult, Locale, ValueObject};

use crate::delivery::DeliveryTime;
use crate::money::Money;
use crate::service::{Package, Service};

/// Package name used when a service is sold at its flat base price.
pub const STANDARD_PACKAGE_NAME: &str = "Standard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Package,
    Service,
}

/// Frozen economics of what the buyer is paying for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedSelection {
    pub package_name: String,
    pub price: Money,
    /// Localized human label, e.g. "3 days".
    pub delivery_time: String,
    /// Parsed from the base-language label; `None` when it has no number.
    pub delivery: Option<DeliveryTime>,
    pub revisions: u32,
    pub features: Vec<String>,
    pub source: SelectionSource,
}

impl ValueObject for PricedSelection {}

/// Resolve the priced selection for `service`.
///
/// Fails only with `InvalidService` when there is nothing to price. An unknown
/// `requested_package` silently degrades to the default choice.
pub fn resolve(
    service: &Service,
    requested_package: Option<&str>,
    locale: &Locale,
) -> DomainResult<PricedSelection> {
    match select_package(service.packages(), requested_package) {
        Some(package) => Ok(snapshot_package(service, package, locale)),
        None => resolve_base(service, locale),
    }
}

/// The requested package if it exists, else the popular one, else the first.
/// `None` only for an empty list.
fn select_package<'a>(packages: &'a [Package], requested: Option<&str>) -> Option<&'a Package> {
    let default = packages
        .iter()
        .find(|p| p.is_popular)
        .or_else(|| packages.first())?;

    if let Some(name) = requested.filter(|name| !name.is_empty()) {
        if let Some(found) = packages.iter().find(|p| p.name == name) {
            return Some(found);
        }
        tracing::debug!(requested = name, "unknown package requested; using default package");
    }

    Some(default)
}

fn snapshot_package(service: &Service, package: &Package, locale: &Locale) -> PricedSelection {
    let amount = package.price.normalize().unwrap_or_else(|| {
        tracing::warn!(
            service_id = %service.id_typed(),
            package = %package.name,
            "package price has no digits; pricing at 0"
        );
        0
    });

    PricedSelection {
        package_name: package.name.clone(),
        price: Money::new(amount, service.currency()),
        delivery_time: package.delivery_time.resolve(locale).clone(),
        delivery: parse_delivery(service, package.delivery_time.base()),
        revisions: package.revisions,
        features: package.features.resolve(locale).clone(),
        source: SelectionSource::Package,
    }
}

fn resolve_base(service: &Service, locale: &Locale) -> DomainResult<PricedSelection> {
    let amount = service
        .price()
        .and_then(|price| price.normalize())
        .ok_or_else(|| {
            DomainError::invalid_service(format!(
                "service {} has neither a price nor packages",
                service.id_typed()
            ))
        })?;

    Ok(PricedSelection {
        package_name: STANDARD_PACKAGE_NAME.to_string(),
        price: Money::new(amount, service.currency()),
        delivery_time: service.delivery_time().resolve(locale).clone(),
        delivery: parse_delivery(service, service.delivery_time().base()),
        revisions: service.revisions(),
        features: service.features().resolve(locale).clone(),
        source: SelectionSource::Service,
    })
}

fn parse_delivery(service: &Service, label: &str) -> Option<DeliveryTime> {
    match label.parse() {
        Ok(delivery) => Some(delivery),
        Err(e) => {
            tracing::warn!(service_id = %service.id_typed(), error = %e, "unparseable delivery time");
            None
        }
    }
}
