use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use stockpool_auth::permissions::inventory;
use stockpool_core::ProductId;
use stockpool_infra::{ConversionRequest, InventoryEngine};

use crate::app::routes::common::{guard, parse_id};
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/conversions", post(create_conversion))
        .route("/products/:id/adjust", post(adjust_stock))
}

/// POST /conversions
///
/// Answers with the ledger entry, any units created and the updated totals.
pub async fn create_conversion(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::ConversionRequestDto>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::CONVERSIONS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.convert(tenant.tenant_id(), principal.actor_id(), ConversionRequest::from(body)) {
        Ok(result) => Json(dto::ConversionResponse::from(result)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

/// POST /products/{id}/adjust
pub async fn adjust_stock(
    Extension(engine): Extension<Arc<InventoryEngine>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustRequest>,
) -> axum::response::Response {
    let body = match guard(&tenant, &principal, body, inventory::CONVERSIONS_WRITE) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let adjusted = engine.adjust(
        tenant.tenant_id(),
        principal.actor_id(),
        product_id,
        body.delta,
        body.note,
    );
    match adjusted {
        Ok(entry) => {
            (StatusCode::CREATED, Json(dto::LedgerEntryResponse::from(entry))).into_response()
        }
        Err(e) => errors::inventory_error_to_response(e),
    }
}
