//! Configuration loading and representation.

use thiserror::Error;

use marketplace_catalog::Money;
use marketplace_core::Locale;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Process configuration for the order core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    /// Locale used to render notifications.
    pub locale: Locale,
    /// Currency for listings that do not name one.
    pub currency: String,
    /// Prefix for notification action links.
    pub base_url: String,
    /// Delivery attempts per notification, the first send included.
    pub max_delivery_attempts: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            locale: Locale::english(),
            currency: DEFAULT_CURRENCY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
        }
    }
}

impl MarketplaceConfig {
    /// Read `MARKETPLACE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("MARKETPLACE_LOCALE") {
            config.locale = Locale::new(&raw)
                .map_err(|e| ConfigError::invalid("MARKETPLACE_LOCALE", e.to_string()))?;
        }

        if let Some(raw) = get("MARKETPLACE_CURRENCY") {
            if raw.len() != 3 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ConfigError::invalid(
                    "MARKETPLACE_CURRENCY",
                    format!("'{raw}' is not a three-letter currency code"),
                ));
            }
            config.currency = Money::new(0, &raw).currency().to_string();
        }

        match get("MARKETPLACE_BASE_URL") {
            Some(raw) => config.base_url = raw.trim_end_matches('/').to_string(),
            None => tracing::warn!(
                base_url = DEFAULT_BASE_URL,
                "MARKETPLACE_BASE_URL not set; using local default"
            ),
        }

        if let Some(raw) = get("MARKETPLACE_MAX_DELIVERY_ATTEMPTS") {
            config.max_delivery_attempts = match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::invalid(
                        "MARKETPLACE_MAX_DELIVERY_ATTEMPTS",
                        format!("'{raw}' is not a positive integer"),
                    ));
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(
            MarketplaceConfig::from_lookup(lookup(&[])).unwrap(),
            MarketplaceConfig::default()
        );
    }

    #[test]
    fn reads_every_variable() {
        let config = MarketplaceConfig::from_lookup(lookup(&[
            ("MARKETPLACE_LOCALE", "ar_SA"),
            ("MARKETPLACE_CURRENCY", "sar"),
            ("MARKETPLACE_BASE_URL", "https://market.example/"),
            ("MARKETPLACE_MAX_DELIVERY_ATTEMPTS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.locale.as_str(), "ar-sa");
        assert_eq!(config.currency, "SAR");
        assert_eq!(config.base_url, "https://market.example");
        assert_eq!(config.max_delivery_attempts, 3);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config =
            MarketplaceConfig::from_lookup(lookup(&[("MARKETPLACE_LOCALE", "  ")])).unwrap();
        assert_eq!(config.locale, Locale::english());
    }

    #[test]
    fn invalid_values_are_errors() {
        for (key, value) in [
            ("MARKETPLACE_MAX_DELIVERY_ATTEMPTS", "zero"),
            ("MARKETPLACE_MAX_DELIVERY_ATTEMPTS", "0"),
            ("MARKETPLACE_CURRENCY", "dollars"),
            ("MARKETPLACE_LOCALE", "not a locale!"),
        ] {
            let err = MarketplaceConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
        }
    }
}
