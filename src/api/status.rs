use axum::{extract::State, Json};
use serde::Serialize;

use crate::{controller::AppState, domain::SimulationMode, engine::EngineStatus};

pub const API_VERSION: &str = "1.0.0";

/// System status response
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    server: String,
    engine: EngineInfo,
    /// Whether configuration allows the native engine at all
    native_enabled: bool,
    api_version: String,
    uptime_seconds: u64,
}

/// Engine selection as seen by clients
#[derive(Debug, Serialize)]
pub struct EngineInfo {
    available: bool,
    mode: SimulationMode,
}

impl From<EngineStatus> for EngineInfo {
    fn from(status: EngineStatus) -> Self {
        Self {
            available: status.native_available,
            mode: status.mode,
        }
    }
}

/// API information returned from the root path
#[derive(Debug, Serialize)]
pub struct ApiInfo {
    message: String,
    version: String,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    health: &'static str,
    simulate: &'static str,
    status: &'static str,
    reset: &'static str,
}

/// GET / - API information
pub async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Power Grid Simulation API".to_string(),
        version: API_VERSION.to_string(),
        endpoints: Endpoints {
            health: "/health",
            simulate: "/api/simulate",
            status: "/api/status",
            reset: "/api/engine/reset",
        },
    })
}

/// GET /api/status - Server and engine status
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        server: "running".to_string(),
        engine: state.controller.engine_status().into(),
        native_enabled: state.cfg.engine.native_enabled,
        api_version: API_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// POST /api/engine/reset - Re-attempt native engine start-up
pub async fn reset_engine(State(state): State<AppState>) -> Json<EngineInfo> {
    let controller = state.controller.clone();
    // Native start-up is blocking work
    let status = tokio::task::spawn_blocking(move || controller.reset_engine())
        .await
        .unwrap_or_else(|_| state.controller.engine_status());
    Json(status.into())
}
