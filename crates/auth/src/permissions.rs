use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "inventory.stock.read").
///
/// The wildcard `"*"` lets a policy grant everything without listing
/// permissions in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inventory engine permissions.
pub mod inventory {
    use std::borrow::Cow;

    use super::Permission;

    /// Availability, stock snapshots, units, ledger, reservations, change feed.
    pub const STOCK_READ: Permission = Permission(Cow::Borrowed("inventory.stock.read"));
    pub const RESERVATIONS_WRITE: Permission =
        Permission(Cow::Borrowed("inventory.reservations.write"));
    pub const CONVERSIONS_WRITE: Permission =
        Permission(Cow::Borrowed("inventory.conversions.write"));
    pub const UNITS_WRITE: Permission = Permission(Cow::Borrowed("inventory.units.write"));
    pub const PRODUCTS_WRITE: Permission = Permission(Cow::Borrowed("inventory.products.write"));
}
