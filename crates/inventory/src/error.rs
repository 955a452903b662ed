use thiserror::Error;

use stockpool_core::{ProductId, ReservationId, UnitId};

use crate::unit::UnitStatus;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Typed failures of the availability / allocation / conversion engine.
///
/// Logical conflicts (`InsufficientStock`, `UnitUnavailable`) are surfaced to the
/// caller as-is; the caller re-fetches availability and retries the whole
/// operation. The engine never grants a different quantity or unit set than
/// the one requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("unit {0} is unavailable for the requested window")]
    UnitUnavailable(UnitId),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Two units ended up with the same code. Fatal: the code sequence was not
    /// serialized, and nothing retries with a different code.
    #[error("duplicate unit code: {0}")]
    DuplicateUnitCode(String),

    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("product is inactive: {0}")]
    ProductInactive(ProductId),

    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: UnitStatus, to: UnitStatus },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("units belong to more than one product")]
    MixedProducts,

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl InventoryError {
    /// Stable machine-readable code (used in API error bodies).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::UnitUnavailable(_) => "unit_unavailable",
            Self::InvalidQuantity(_) => "invalid_quantity",
            Self::DuplicateUnitCode(_) => "duplicate_unit_code",
            Self::ReservationNotFound(_) => "reservation_not_found",
            Self::ProductNotFound(_) => "product_not_found",
            Self::ProductInactive(_) => "product_inactive",
            Self::UnitNotFound(_) => "unit_not_found",
            Self::InvalidWindow(_) => "invalid_window",
            Self::InvalidStatusTransition { .. } => "invalid_status_transition",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MixedProducts => "mixed_products",
            Self::IntegrityViolation(_) => "integrity_violation",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether the caller lost a race for stock (re-fetch availability and retry).
    pub fn is_allocation_conflict(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. } | Self::UnitUnavailable(_))
    }
}
