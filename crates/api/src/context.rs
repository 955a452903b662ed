use stockpool_auth::{PrincipalId, Role};
use stockpool_core::{ActorId, TenantId};

/// Tenant context for a request.
///
/// Taken from the verified token and present on every protected route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity + roles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, roles: Vec<Role>) -> Self {
        Self { principal_id, roles }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// Actor stamped on ledger entries and reservations.
    pub fn actor_id(&self) -> ActorId {
        self.principal_id.actor_id()
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
