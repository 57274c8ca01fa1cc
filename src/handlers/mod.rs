pub mod admin;
pub mod auth;
pub mod devices;
pub mod sync;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The full core surface without rate-limit layers (tests use this; the
/// binary applies per-tier limits in `main`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(devices::router())
        .merge(sync::router())
        .merge(admin::router())
}
