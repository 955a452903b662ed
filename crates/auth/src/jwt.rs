//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Bad signature, wrong algorithm or undecodable payload.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// HMAC-SHA256 tokens with a shared secret.
///
/// The time window is checked with `validate_claims` against the caller's
/// clock rather than by the JWT library.
pub struct Hs256JwtValidator {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            decoding: DecodingKey::from_secret(secret.as_ref()),
            encoding: EncodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Sign claims with the same secret (dev tooling and tests).
    pub fn issue(&self, claims: &JwtClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::Invalid(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        let data = decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| JwtError::Invalid(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use stockpool_core::TenantId;

    use super::*;
    use crate::{PrincipalId, Role};

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims::new(
            PrincipalId::new(),
            TenantId::new(),
            vec![Role::SCHEDULER],
            now,
            Duration::minutes(10),
        )
    }

    #[test]
    fn issued_tokens_validate_with_the_same_secret() {
        let validator = Hs256JwtValidator::new("secret");
        let now = Utc::now();
        let c = claims(now);
        let token = validator.issue(&c).unwrap();

        assert_eq!(validator.validate(&token, now).unwrap(), c);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let now = Utc::now();
        let token = Hs256JwtValidator::new("other").issue(&claims(now)).unwrap();

        assert!(matches!(
            Hs256JwtValidator::new("secret").validate(&token, now),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let validator = Hs256JwtValidator::new("secret");
        let now = Utc::now();
        let token = validator.issue(&claims(now)).unwrap();

        assert_eq!(
            validator.validate(&token, now + Duration::hours(1)),
            Err(JwtError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            Hs256JwtValidator::new("secret").validate("not-a-token", Utc::now()),
            Err(JwtError::Invalid(_))
        ));
    }
}
