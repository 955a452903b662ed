use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, warn};

use stockpool_inventory::InventoryError;

/// HTTP status for an engine error.
pub fn status_for(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::InsufficientStock { .. }
        | InventoryError::UnitUnavailable(_)
        | InventoryError::ProductInactive(_) => StatusCode::CONFLICT,
        InventoryError::InvalidQuantity(_)
        | InventoryError::InvalidWindow(_)
        | InventoryError::InvalidRequest(_)
        | InventoryError::InvalidStatusTransition { .. }
        | InventoryError::MixedProducts => StatusCode::BAD_REQUEST,
        InventoryError::ReservationNotFound(_)
        | InventoryError::ProductNotFound(_)
        | InventoryError::UnitNotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::DuplicateUnitCode(_)
        | InventoryError::IntegrityViolation(_)
        | InventoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, code = err.code(), "inventory operation failed");
    } else if err.is_allocation_conflict() {
        warn!(error = %err, code = err.code(), "allocation rejected");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}
