//! Read side: availability for a window and the aggregated stock snapshot.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use stockpool_auth::permissions::inventory;
use stockpool_core::ProductId;
use stockpool_infra::InventoryEngine;

use crate::app::routes::common::{guard, parse_id};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/availability", get(get_availability))
        .route("/stock/:product_id", get(get_stock))
        .route("/stock/:product_id/verify", get(verify_stock))
}

/// GET /availability?productId=&start=&end=
pub async fn get_availability(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::AvailabilityQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&query.product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.available(tenant.tenant_id(), product_id, query.start, query.end) {
        Ok(availability) => Json(dto::AvailabilityResponse::from(availability)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// GET /stock/{productId}
pub async fn get_stock(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.stock(tenant.tenant_id(), product_id) {
        Ok(totals) => Json(dto::StockResponse::from(totals)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// GET /stock/{productId}/verify
///
/// Reconciles the ledger against the unit registry; 500 on mismatch.
pub async fn verify_stock(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&tenant, &principal, (), inventory::STOCK_READ) {
        return resp;
    }
    let product_id: ProductId = match parse_id(&product_id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.verify_invariant(tenant.tenant_id(), product_id) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "productId": product_id, "consistent": true })),
        )
            .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
