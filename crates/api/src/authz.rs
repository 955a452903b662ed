//! API-side authorization guard.
//!
//! Checked at the HTTP boundary before the engine is called; the engine itself
//! is auth-agnostic and only records the acting principal.

use stockpool_auth::permissions::inventory;
use stockpool_auth::{
    AuthzError, CommandAuthorization, Permission, Principal, Role, TenantMembership, authorize,
};

use crate::context::{PrincipalContext, TenantContext};

/// Check authorization for an operation in the current request context.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let membership = TenantMembership {
        tenant_id: tenant.tenant_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_from_roles(principal.roles()),
    };

    let principal = Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership,
    };

    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }

    Ok(())
}

/// Static role policy. Unknown roles grant nothing.
pub fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.contains(&Role::ADMIN) {
        return vec![Permission::WILDCARD];
    }

    let mut perms: Vec<Permission> = Vec::new();
    for perm in roles.iter().flat_map(role_permissions) {
        if !perms.contains(&perm) {
            perms.push(perm);
        }
    }
    perms
}

fn role_permissions(role: &Role) -> Vec<Permission> {
    match role.as_str() {
        "scheduler" => vec![inventory::STOCK_READ, inventory::RESERVATIONS_WRITE],
        "warehouse" => vec![
            inventory::STOCK_READ,
            inventory::CONVERSIONS_WRITE,
            inventory::UNITS_WRITE,
            inventory::PRODUCTS_WRITE,
        ],
        "viewer" => vec![inventory::STOCK_READ],
        _ => Vec::new(),
    }
}
