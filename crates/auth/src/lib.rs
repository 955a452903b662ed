//! `stockpool-auth`: authentication/authorization boundary (zero-trust).
//!
//! Decoupled from HTTP and storage: the API layer extracts the bearer token,
//! this crate verifies it and answers "may this principal do that here?".

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
