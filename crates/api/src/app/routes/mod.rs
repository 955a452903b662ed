use axum::{Router, routing::get};

pub mod common;
pub mod conversions;
pub mod products;
pub mod reservations;
pub mod stock;
pub mod stream;
pub mod system;
pub mod units;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(stream::stream_events))
        .merge(stock::router())
        .merge(reservations::router())
        .merge(conversions::router())
        .merge(products::router())
        .merge(units::router())
}
