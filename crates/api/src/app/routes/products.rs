use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockpool_auth::permissions::inventory;
use stockpool_core::ProductId;
use stockpool_infra::InventoryEngine;
use stockpool_inventory::{NewProduct, UnitStatus};

use crate::app::routes::common::{guard, parse_id};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/deactivate", post(deactivate_product))
        .route("/products/:id/units", get(list_units))
        .route("/products/:id/ledger", get(list_ledger))
        .route("/products/:id/reservations", get(list_reservations))
}

pub async fn create_product(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::PRODUCTS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.create_product(tenant.tenant_id(), NewProduct::from(body)) {
        Ok(product) => {
            (StatusCode::CREATED, Json(dto::ProductResponse::from(product))).into_response()
        }
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }

    match engine.products(tenant.tenant_id()) {
        Ok(products) => Json(
            products
                .into_iter()
                .map(dto::ProductResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.product(tenant.tenant_id(), product_id) {
        Ok(product) => Json(dto::ProductResponse::from(product)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// POST /products/{id}/deactivate
///
/// Soft delete; history stays readable, new reservations and conversions fail.
pub async fn deactivate_product(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::PRODUCTS_WRITE) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.deactivate_product(tenant.tenant_id(), product_id) {
        Ok(product) => Json(dto::ProductResponse::from(product)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// GET /products/{id}/units?status=
pub async fn list_units(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::UnitsQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match query.status.as_deref().map(str::parse::<UnitStatus>).transpose() {
        Ok(v) => v,
        Err(e) => return errors::inventory_error_to_response(e),
    };

    match engine.units(tenant.tenant_id(), product_id, status) {
        Ok(units) => {
            let units: Vec<dto::UnitResponse> = units.into_iter().map(Into::into).collect();
            Json(units).into_response()
        }
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// GET /products/{id}/ledger
pub async fn list_ledger(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.ledger_entries(tenant.tenant_id(), product_id) {
        Ok(entries) => Json(
            entries
                .into_iter()
                .map(dto::LedgerEntryResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// GET /products/{id}/reservations?includeReleased=
pub async fn list_reservations(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::ReservationsQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.reservations_for_product(tenant.tenant_id(), product_id, query.include_released) {
        Ok(reservations) => Json(
            reservations
                .into_iter()
                .map(dto::ReservationResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
