//! Marketplace participant roles.

use serde::{Deserialize, Serialize};

/// Role of a participant relative to an order.
///
/// Supplied by the identity collaborator for the acting user, and used as the
/// recipient role when notifications are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The buyer.
    Client,
    /// The seller.
    Freelancer,
    /// Platform operator.
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Freelancer, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Freelancer => "freelancer",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
