//! Simulation endpoint

use axum::{extract::State, Json};

use crate::{
    api::{error::ApiError, extract::ValidJson},
    controller::AppState,
    domain::{SimulationRequest, SimulationResult},
};

/// POST /api/simulate - Compute grid metrics for one load/generation pair
pub async fn simulate(
    State(st): State<AppState>,
    ValidJson(request): ValidJson<SimulationRequest>,
) -> Result<Json<SimulationResult>, ApiError> {
    let result = st.controller.simulate(&request)?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        api,
        config::Config,
        domain::{GridConstants, SimulationMode},
        engine::{EngineError, EngineSelector, GridEngine, MockGridEngine},
    };

    use super::*;

    #[tokio::test]
    async fn test_internal_computation_returns_generic_500() {
        let mut mock = MockGridEngine::new();
        mock.expect_mode().return_const(SimulationMode::Native);
        mock.expect_compute().returning(|_, _| {
            Err(EngineError::InternalComputation(
                "system_frequency_hz is not finite".to_string(),
            ))
        });
        mock.expect_shutdown().return_const(());
        let engine: Arc<dyn GridEngine> = Arc::new(mock);

        let cfg = Config::default();
        let selector =
            EngineSelector::start(GridConstants::default(), Box::new(move || Ok(engine.clone())));
        let app = api::router(AppState::with_selector(cfg.clone(), selector), &cfg);

        let request = Request::builder()
            .method("POST")
            .uri("/api/simulate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"load_mw": 1000.0, "generation_mw": 1000.0}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"Internal server error","status_code":500}"#);
        assert!(!body.contains("not finite"));
    }
}
