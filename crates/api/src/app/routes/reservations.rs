use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use stockpool_auth::permissions::inventory;
use stockpool_core::{JobId, ReservationId};
use stockpool_infra::InventoryEngine;

use crate::app::routes::common::{guard, parse_id};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/reservations", post(create_reservation))
        .route("/reservations/:id", get(get_reservation).delete(release_reservation))
        .route("/reservations/:id/window", put(reschedule_reservation))
        .route("/jobs/:job_id/reservations", delete(release_job))
}

/// POST /reservations
///
/// Check and commit happen in one engine call; a lost race comes back as 409.
pub async fn create_reservation(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateReservationRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::RESERVATIONS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let request = match body.into_allocation() {
        Ok(v) => v,
        Err(e) => return errors::inventory_error_to_response(e),
    };

    match engine.reserve(tenant.tenant_id(), principal.actor_id(), request) {
        Ok(reservation) => (
            StatusCode::CREATED,
            Json(dto::ReservationResponse::from(reservation)),
        )
            .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn get_reservation(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let reservation_id: ReservationId = match parse_id(&id, "reservation") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.reservation(tenant.tenant_id(), reservation_id) {
        Ok(reservation) => Json(dto::ReservationResponse::from(reservation)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// DELETE /reservations/{id}
///
/// Idempotent: unknown or already released reservations answer 200 with
/// `released: false`.
pub async fn release_reservation(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::RESERVATIONS_WRITE) {
        return resp;
    }
    let reservation_id: ReservationId = match parse_id(&id, "reservation") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.release(tenant.tenant_id(), reservation_id) {
        Ok(released) => Json(dto::ReleaseResponse {
            reservation_id,
            released,
        })
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// PUT /reservations/{id}/window
pub async fn reschedule_reservation(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::WindowDto>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::RESERVATIONS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reservation_id: ReservationId = match parse_id(&id, "reservation") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let window = match body.into_window() {
        Ok(v) => v,
        Err(e) => return errors::inventory_error_to_response(e),
    };

    match engine.reschedule(tenant.tenant_id(), reservation_id, window) {
        Ok(reservation) => Json(dto::ReservationResponse::from(reservation)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// DELETE /jobs/{jobId}/reservations
pub async fn release_job(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::RESERVATIONS_WRITE) {
        return resp;
    }
    let job_id: JobId = match parse_id(&job_id, "job") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.release_job(tenant.tenant_id(), job_id) {
        Ok(released) => Json(dto::ReleaseJobResponse { job_id, released }).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
