//! HTTP application wiring (axum router + engine).
//!
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies and mapping to engine types
//! - `errors.rs`: consistent `{error, message}` responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockpool_auth::Hs256JwtValidator;
use stockpool_infra::InventoryEngine;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the router over an existing engine.
pub fn build_app(jwt_secret: impl Into<String>, engine: Arc<InventoryEngine>) -> Router {
    let secret: String = jwt_secret.into();
    let jwt = Arc::new(Hs256JwtValidator::new(secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(engine))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

/// Build the router with a fresh in-memory engine configured from `config`.
pub fn build_app_from_config(config: &AppConfig) -> Router {
    let engine = Arc::new(InventoryEngine::in_memory(config.engine.clone()));
    build_app(config.auth.jwt_secret.clone(), engine)
}
