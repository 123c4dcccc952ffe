//! Localized field resolution with base-language fallback.
//!
//! Listing records carry a base field (`title`) and optional per-language
//! variants (`title_ar`). Every localized attribute goes through the same
//! rule: a non-blank variant for the active locale wins, else the base value.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use marketplace_core::{DomainError, DomainResult, Locale};

/// Values that can be "present but empty".
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T: Blank> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.iter().all(Blank::is_blank)
    }
}

/// A base value plus translations keyed by locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Localized<T> {
    base: T,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    translations: BTreeMap<String, T>,
}

impl<T> Localized<T> {
    pub fn new(base: T) -> Self {
        Self {
            base,
            translations: BTreeMap::new(),
        }
    }

    pub fn with_translation(mut self, locale: &Locale, value: T) -> Self {
        self.translations.insert(locale.as_str().to_string(), value);
        self
    }

    pub fn base(&self) -> &T {
        &self.base
    }

    pub fn translation(&self, locale: &Locale) -> Option<&T> {
        self.translations.get(locale.as_str())
    }
}

impl<T: Blank> Localized<T> {
    /// Value for `locale`: exact tag, then primary language, then base.
    pub fn resolve(&self, locale: &Locale) -> &T {
        [locale.as_str(), locale.language()]
            .into_iter()
            .filter_map(|tag| self.translations.get(tag))
            .find(|value| !value.is_blank())
            .unwrap_or(&self.base)
    }
}

impl<T: Blank + DeserializeOwned> Localized<T> {
    /// Collect `field` and its `field_<lang>` siblings from a JSON record.
    ///
    /// Returns `Ok(None)` when the base field is absent or null. A suffix only
    /// counts as a language when its primary subtag is 2-3 ASCII letters, so
    /// `delivery_time` is not read as a translation of `delivery`.
    pub fn from_suffixed_fields(
        record: &Map<String, JsonValue>,
        field: &str,
    ) -> DomainResult<Option<Self>> {
        let base = match record.get(field) {
            None | Some(JsonValue::Null) => return Ok(None),
            Some(value) => decode::<T>(field, value)?,
        };

        let prefix = format!("{field}_");
        let mut localized = Self::new(base);
        for (key, value) in record {
            let Some(suffix) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some(locale) = language_suffix(suffix) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            localized
                .translations
                .insert(locale.as_str().to_string(), decode::<T>(key, value)?);
        }
        Ok(Some(localized))
    }
}

fn language_suffix(suffix: &str) -> Option<Locale> {
    let locale = Locale::new(suffix).ok()?;
    let language = locale.language();
    let looks_like_language =
        (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_alphabetic());
    looks_like_language.then_some(locale)
}

fn decode<T: DeserializeOwned>(key: &str, value: &JsonValue) -> DomainResult<T> {
    T::deserialize(value).map_err(|e| DomainError::validation(format!("field '{key}': {e}")))
}
