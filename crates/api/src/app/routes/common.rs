use core::str::FromStr;

use axum::http::StatusCode;
use axum::response::Response;

use stockpool_auth::{CommandAuthorization, Permission};

use crate::app::errors;
use crate::context::{PrincipalContext, TenantContext};

/// Associates required permissions with a request.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Authorize `inner` for the current principal, handing it back on success.
pub fn guard<C>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    inner: C,
    required: Permission,
) -> Result<C, Response> {
    let cmd = CmdAuth {
        inner,
        required: vec![required],
    };
    if let Err(e) = crate::authz::authorize_command(tenant, principal, &cmd) {
        return Err(errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()));
    }
    Ok(cmd.inner)
}

/// Parse a path id, answering 400 `invalid_id` on failure.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, Response> {
    raw.parse().map_err(|_| errors::invalid_id(what))
}
