use serde::{Deserialize, Serialize};

use marketplace_core::{AggregateId, Entity, Locale, UserId};

use crate::localized::Localized;
use crate::money::PriceInput;

/// Published service identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub AggregateId);

impl ServiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A named, priced variant of a service (Basic/Standard/Premium).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub price: PriceInput,
    pub delivery_time: Localized<String>,
    pub revisions: u32,
    pub features: Localized<Vec<String>>,
    /// Selection hint; when several packages claim it the first one wins.
    #[serde(default)]
    pub is_popular: bool,
}

impl Package {
    pub fn new(name: impl Into<String>, price: impl Into<PriceInput>, delivery_time: &str) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            delivery_time: Localized::new(delivery_time.to_string()),
            revisions: 0,
            features: Localized::default(),
            is_popular: false,
        }
    }

    pub fn with_revisions(mut self, revisions: u32) -> Self {
        self.revisions = revisions;
        self
    }

    pub fn with_features(mut self, features: Localized<Vec<String>>) -> Self {
        self.features = features;
        self
    }

    pub fn popular(mut self) -> Self {
        self.is_popular = true;
        self
    }
}

/// A published, sellable listing.
///
/// Read-only once published: the builder methods below exist for loading and
/// tests, and orders only ever borrow a service to snapshot it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    id: ServiceId,
    owner: UserId,
    title: Localized<String>,
    description: Localized<String>,
    category: Localized<String>,
    tags: Localized<Vec<String>>,
    price: Option<PriceInput>,
    delivery_time: Localized<String>,
    revisions: u32,
    features: Localized<Vec<String>>,
    currency: String,
    packages: Vec<Package>,
}

/// Locale-resolved copy of a service's localized attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedServiceView<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub tags: &'a [String],
    pub delivery_time: &'a str,
    pub features: &'a [String],
}

impl Service {
    pub const DEFAULT_CURRENCY: &'static str = "USD";

    pub fn new(id: ServiceId, owner: UserId, title: Localized<String>) -> Self {
        Self {
            id,
            owner,
            title,
            description: Localized::default(),
            category: Localized::default(),
            tags: Localized::default(),
            price: None,
            delivery_time: Localized::default(),
            revisions: 0,
            features: Localized::default(),
            currency: Self::DEFAULT_CURRENCY.to_string(),
            packages: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Localized<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_category(mut self, category: Localized<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_tags(mut self, tags: Localized<Vec<String>>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_price(mut self, price: impl Into<PriceInput>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_delivery_time(mut self, delivery_time: Localized<String>) -> Self {
        self.delivery_time = delivery_time;
        self
    }

    pub fn with_revisions(mut self, revisions: u32) -> Self {
        self.revisions = revisions;
        self
    }

    pub fn with_features(mut self, features: Localized<Vec<String>>) -> Self {
        self.features = features;
        self
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.trim().to_ascii_uppercase();
        self
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.push(package);
        self
    }

    pub fn id_typed(&self) -> ServiceId {
        self.id
    }

    /// The seller.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn title(&self) -> &Localized<String> {
        &self.title
    }

    pub fn price(&self) -> Option<&PriceInput> {
        self.price.as_ref()
    }

    pub fn delivery_time(&self) -> &Localized<String> {
        &self.delivery_time
    }

    pub fn revisions(&self) -> u32 {
        self.revisions
    }

    pub fn features(&self) -> &Localized<Vec<String>> {
        &self.features
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn localized(&self, locale: &Locale) -> LocalizedServiceView<'_> {
        LocalizedServiceView {
            title: self.title.resolve(locale),
            description: self.description.resolve(locale),
            category: self.category.resolve(locale),
            tags: self.tags.resolve(locale),
            delivery_time: self.delivery_time.resolve(locale),
            features: self.features.resolve(locale),
        }
    }
}

impl Entity for Service {
    type Id = ServiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_view_resolves_every_field_uniformly() {
        let ar = Locale::new("ar").unwrap();
        let service = Service::new(
            ServiceId::new(AggregateId::new()),
            UserId::new(),
            Localized::new("Logo design".to_string()).with_translation(&ar, "تصميم شعار".to_string()),
        )
        .with_category(Localized::new("Design".to_string()))
        .with_tags(
            Localized::new(vec!["logo".to_string()]).with_translation(&ar, vec!["شعار".to_string()]),
        )
        .with_delivery_time(
            Localized::new("3 days".to_string()).with_translation(&ar, String::new()),
        );

        let view = service.localized(&ar);
        assert_eq!(view.title, "تصميم شعار");
        assert_eq!(view.category, "Design");
        assert_eq!(view.tags, ["شعار".to_string()]);
        assert_eq!(view.delivery_time, "3 days");
        assert!(view.features.is_empty());
    }

    #[test]
    fn currency_is_normalized() {
        let service = Service::new(
            ServiceId::new(AggregateId::new()),
            UserId::new(),
            Localized::new("x".to_string()),
        )
        .with_currency(" sar ");
        assert_eq!(service.currency(), "SAR");
    }
}
