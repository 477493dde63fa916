use axum::{extract::State, Json};
use serde::Serialize;

use crate::{controller::AppState, domain::SimulationMode};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    native_available: bool,
    simulation_mode: SimulationMode,
}

/// GET /health - Health check endpoint
///
/// The server is healthy in either mode; the fallback engine is always
/// available.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.controller.engine_status();
    Json(HealthResponse {
        status: "healthy".to_string(),
        native_available: engine.native_available,
        simulation_mode: engine.mode,
    })
}
