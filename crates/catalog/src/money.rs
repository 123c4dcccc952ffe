//! Fixed-point money and listing price normalization.

use serde::{Deserialize, Serialize};

use marketplace_core::{Locale, ValueObject};

/// Monetary amount in the smallest unit a listing is priced in.
///
/// Integer only; there is no floating-point path anywhere in pricing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: u64,
    currency: String,
}

impl Money {
    pub fn new(amount: u64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.trim().to_ascii_uppercase(),
        }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// ISO 4217 code, uppercased.
    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl ValueObject for Money {}

/// A listing price as it was stored: a clean integer or a formatted string
/// such as `"$1,500"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Amount(u64),
    Text(String),
}

impl PriceInput {
    /// Integer value of the price, or `None` when there is nothing numeric to
    /// read.
    pub fn normalize(&self) -> Option<u64> {
        match self {
            PriceInput::Amount(amount) => Some(*amount),
            PriceInput::Text(raw) => normalize_price(raw),
        }
    }
}

impl From<u64> for PriceInput {
    fn from(value: u64) -> Self {
        PriceInput::Amount(value)
    }
}

impl From<&str> for PriceInput {
    fn from(value: &str) -> Self {
        PriceInput::Text(value.to_string())
    }
}

/// Strip every non-digit character and parse what remains.
///
/// Currency symbols, thousands separators and decimal marks all go, so
/// `"$1,500"` and `"1.500 SAR"` both read as `1500`. Re-normalizing the
/// rendered result is a no-op. Returns `None` for digit-free input or values
/// that overflow `u64`.
pub fn normalize_price(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Locale/formatting collaborator: renders an integer amount for display.
pub trait CurrencyFormatter: Send + Sync {
    fn format(&self, money: &Money, locale: &Locale) -> String;
}

/// Grouping and code placement by primary language subtag.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCurrencyFormatter;

impl StandardCurrencyFormatter {
    fn group_separator(language: &str) -> &'static str {
        match language {
            "de" | "es" | "it" | "pt" | "tr" | "nl" | "id" => ".",
            "fr" => "\u{202f}",
            _ => ",",
        }
    }

    fn code_first(language: &str) -> bool {
        matches!(language, "en" | "ar" | "he" | "ja" | "zh" | "ko")
    }
}

impl CurrencyFormatter for StandardCurrencyFormatter {
    fn format(&self, money: &Money, locale: &Locale) -> String {
        let language = locale.language();
        let grouped = group_digits(money.amount(), Self::group_separator(language));
        if Self::code_first(language) {
            format!("{} {}", money.currency(), grouped)
        } else {
            format!("{} {}", grouped, money.currency())
        }
    }
}

fn group_digits(amount: u64, separator: &str) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(tag: &str) -> Locale {
        Locale::new(tag).unwrap()
    }

    #[test]
    fn strips_symbols_and_separators() {
        assert_eq!(normalize_price("$1,500"), Some(1500));
        assert_eq!(normalize_price("1.500 SAR"), Some(1500));
        assert_eq!(normalize_price(" 250 "), Some(250));
        assert_eq!(normalize_price("free"), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn overflowing_digit_runs_are_rejected() {
        assert_eq!(normalize_price("99999999999999999999999"), None);
    }

    #[test]
    fn price_input_deserializes_from_number_or_string() {
        let n: PriceInput = serde_json::from_str("1500").unwrap();
        let s: PriceInput = serde_json::from_str("\"$1,500\"").unwrap();
        assert_eq!(n, PriceInput::Amount(1500));
        assert_eq!(s.normalize(), n.normalize());
    }

    #[test]
    fn currency_code_is_uppercased() {
        assert_eq!(Money::new(5, " usd").currency(), "USD");
    }

    #[test]
    fn formats_per_locale_conventions() {
        let f = StandardCurrencyFormatter;
        let m = Money::new(1_234_567, "USD");
        assert_eq!(f.format(&m, &locale("en-US")), "USD 1,234,567");
        assert_eq!(f.format(&m, &locale("de")), "1.234.567 USD");
        assert_eq!(f.format(&m, &locale("fr")), "1\u{202f}234\u{202f}567 USD");
        assert_eq!(f.format(&Money::new(999, "SAR"), &locale("ar")), "SAR 999");
        assert_eq!(f.format(&Money::new(0, "EUR"), &locale("it")), "0 EUR");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: normalizing an already-normalized price is a no-op.
            #[test]
            fn normalization_is_idempotent(raw in "[$€£ ,.A-Za-z0-9]{0,24}") {
                if let Some(once) = normalize_price(&raw) {
                    prop_assert_eq!(normalize_price(&once.to_string()), Some(once));
                    prop_assert_eq!(PriceInput::Amount(once).normalize(), Some(once));
                }
            }

            /// Property: clean integers pass through untouched.
            #[test]
            fn integers_are_fixed_points(value in any::<u64>()) {
                prop_assert_eq!(normalize_price(&value.to_string()), Some(value));
            }
        }
    }
}
