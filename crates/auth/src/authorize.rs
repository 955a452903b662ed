use std::collections::HashSet;

use thiserror::Error;

use stockpool_core::TenantId;

use crate::{Permission, PrincipalId, TenantMembership};

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Implemented by operations that require permissions; the API checks them
/// before calling into the engine.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant. Pure policy check, no IO.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::inventory;

    fn principal(tenant_id: TenantId, permissions: Vec<Permission>) -> Principal {
        Principal {
            principal_id: PrincipalId::new(),
            active_tenant_id: tenant_id,
            membership: TenantMembership {
                tenant_id,
                roles: vec![],
                permissions,
            },
        }
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(TenantId::new(), vec![Permission::WILDCARD]);
        assert!(authorize(&p, &inventory::CONVERSIONS_WRITE).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(TenantId::new(), vec![inventory::STOCK_READ]);
        assert!(authorize(&p, &inventory::STOCK_READ).is_ok());
        assert_eq!(
            authorize(&p, &inventory::RESERVATIONS_WRITE),
            Err(AuthzError::Forbidden("inventory.reservations.write".to_string()))
        );
    }

    #[test]
    fn membership_must_match_the_active_tenant() {
        let mut p = principal(TenantId::new(), vec![Permission::WILDCARD]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(authorize(&p, &inventory::STOCK_READ), Err(AuthzError::TenantMismatch));
    }
}
