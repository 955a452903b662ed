use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Opaque at this layer; the API's policy maps roles to permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Everything in the tenant.
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    /// Books jobs: reads stock, reserves and releases.
    pub const SCHEDULER: Role = Role(Cow::Borrowed("scheduler"));
    /// Maintains stock: conversions, adjustments, unit lifecycle.
    pub const WAREHOUSE: Role = Role(Cow::Borrowed("warehouse"));
    /// Read-only.
    pub const VIEWER: Role = Role(Cow::Borrowed("viewer"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
