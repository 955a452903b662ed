//! Errors raised by the core primitives.

use thiserror::Error;

/// An identifier string that is not a valid UUID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {reason}")]
pub struct ParseIdError {
    kind: &'static str,
    reason: String,
}

impl ParseIdError {
    pub fn new(kind: &'static str, reason: impl ToString) -> Self {
        Self {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Id type that failed to parse (`UnitId`, `TenantId`, ...).
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}
