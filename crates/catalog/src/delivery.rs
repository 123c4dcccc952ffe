//! Delivery time parsed from listing strings such as "3 days".

use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::DomainError;

const HOURS_PER_DAY: u32 = 24;

/// Promised turnaround for a package, stored in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryTime {
    hours: u32,
}

impl DeliveryTime {
    pub fn days(days: u32) -> Self {
        Self {
            hours: days.saturating_mul(HOURS_PER_DAY),
        }
    }

    pub fn hours(hours: u32) -> Self {
        Self { hours }
    }

    pub fn as_hours(&self) -> u32 {
        self.hours
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.hours))
    }

    /// Due date for work that starts at `start`.
    pub fn due_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.duration()
    }
}

impl FromStr for DeliveryTime {
    type Err = DomainError;

    /// Reads the first number and the unit word after it. Unknown or missing
    /// units count as days, so localized strings like "3 أيام" still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let start = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| DomainError::validation(format!("no duration in '{s}'")))?;
        let rest = &s[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let amount: u32 = rest[..end]
            .parse()
            .map_err(|_| DomainError::validation(format!("duration out of range in '{s}'")))?;

        let unit = rest[end..].trim_start().to_ascii_lowercase();
        let hours_per_unit = if unit.starts_with("hour") || unit.starts_with("hr") {
            1
        } else if unit.starts_with("week") {
            7 * HOURS_PER_DAY
        } else if unit.starts_with("month") {
            30 * HOURS_PER_DAY
        } else {
            HOURS_PER_DAY
        };

        let hours = amount
            .checked_mul(hours_per_unit)
            .ok_or_else(|| DomainError::validation(format!("duration out of range in '{s}'")))?;
        Ok(Self { hours })
    }
}

impl core::fmt::Display for DeliveryTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (n, unit) = if self.hours % HOURS_PER_DAY == 0 {
            (self.hours / HOURS_PER_DAY, "day")
        } else {
            (self.hours, "hour")
        };
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{n} {unit}{plural}")
    }
}

impl TryFrom<String> for DeliveryTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeliveryTime> for String {
    fn from(value: DeliveryTime) -> Self {
        value.to_string()
    }
}
