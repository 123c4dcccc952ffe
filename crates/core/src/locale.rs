//! Active locale tag supplied by the locale/formatting collaborator.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// BCP-47-ish language tag (`en`, `ar`, `pt-BR`).
///
/// Stored lowercased with `-` separators so `pt_BR` and `pt-br` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    pub fn new(tag: &str) -> Result<Self, DomainError> {
        let normalized = tag.trim().replace('_', "-").to_ascii_lowercase();
        let valid = !normalized.is_empty()
            && normalized
                .split('-')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid {
            return Err(DomainError::validation(format!("invalid locale tag '{tag}'")));
        }
        Ok(Self(normalized))
    }

    pub fn english() -> Self {
        Self("en".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`pt` for `pt-br`).
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

impl core::fmt::Display for Locale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separator_and_case() {
        let locale: Locale = "pt_BR".parse().unwrap();
        assert_eq!(locale.as_str(), "pt-br");
        assert_eq!(locale.language(), "pt");
    }

    #[test]
    fn rejects_empty_and_malformed_tags() {
        assert!(Locale::new("  ").is_err());
        assert!(Locale::new("en--us").is_err());
        assert!(Locale::new("e n").is_err());
    }
}
