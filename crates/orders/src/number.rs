use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_core::AggregateId;

/// Human-facing order number, e.g. `ORD-20260301-3F9A2C71`.
///
/// Display only; the aggregate id stays the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD";

    /// Date of placement plus the random tail of the (v7) aggregate id.
    pub fn generate(id: AggregateId, placed_at: DateTime<Utc>) -> Self {
        let hex = id.as_uuid().simple().to_string().to_ascii_uppercase();
        let tail = &hex[hex.len() - 8..];
        Self(format!("{}-{}-{}", Self::PREFIX, placed_at.format("%Y%m%d"), tail))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
