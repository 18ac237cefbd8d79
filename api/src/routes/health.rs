//! Health check endpoint for load balancers and container liveness checks.

use crate::state::AppState;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` when the process can answer.
    pub status: &'static str,
    /// `service.name` from the telemetry resource.
    pub service: String,
    /// Crate version.
    pub version: &'static str,
    /// Storage backend in use (`memory` or `postgresql`).
    pub storage: &'static str,
}

/// Creates the health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness only: the database is not queried, so a degraded service still
/// reports healthy and keeps its container running.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: state.telemetry().service_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        storage: state.store().db_system(),
    })
}
