//! Greeting and health check endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Plain-text greeting served at `/`
pub const GREETING: &str = "Hello World!";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn greeting() -> &'static str {
    GREETING
}

/// Build greeting and health router
pub fn router() -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
}
