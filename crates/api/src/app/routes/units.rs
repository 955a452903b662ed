use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{post, put},
};
use chrono::Utc;

use stockpool_auth::permissions::inventory;
use stockpool_core::UnitId;
use stockpool_infra::InventoryEngine;

use crate::app::routes::common::{guard, parse_id};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/units/:id/status", put(set_unit_status))
        .route("/units/remove", post(remove_units))
        .route("/units/refresh-statuses", post(refresh_statuses))
}

/// PUT /units/{id}/status
///
/// Maintenance, retirement and return to service. `reserved` is owned by
/// the allocation service and rejected here.
pub async fn set_unit_status(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UnitStatusRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::UNITS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_id: UnitId = match parse_id(&id, "unit") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.set_unit_status(tenant.tenant_id(), unit_id, body.status) {
        Ok(unit) => Json(dto::UnitResponse::from(unit)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// POST /units/remove
pub async fn remove_units(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RemoveUnitsRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::UNITS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.remove_units(tenant.tenant_id(), principal.actor_id(), body.unit_ids, body.note) {
        Ok(outcome) => Json(dto::RemoveUnitsResponse {
            entry: outcome.entry.into(),
            removed: outcome.units.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// POST /units/refresh-statuses
///
/// Re-derives every unit's reserved flag for `asOf` (default today).
pub async fn refresh_statuses(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::RefreshStatusesRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::UNITS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let as_of = body.as_of.unwrap_or_else(|| Utc::now().date_naive());

    match engine.refresh_unit_statuses(tenant.tenant_id(), as_of) {
        Ok(changed) => Json(dto::RefreshStatusesResponse { as_of, changed }).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
