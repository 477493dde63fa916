pub mod error;
pub mod extract;
pub mod health;
pub mod simulate;
pub mod status;

use axum::{
    http::{header, Method, StatusCode, Uri},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{api::error::ApiError, config::Config, controller::AppState};

/// Largest accepted request body; a simulation request is two numbers
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new()
        .route("/", get(status::api_info))
        .route("/health", get(health::health_check))
        .route("/api/simulate", post(simulate::simulate))
        .route("/api/status", get(status::get_status))
        .route("/api/engine/reset", post(status::reset_engine))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state);

    if cfg.server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(cfg.server.request_timeout_secs),
                )),
        )
        .layer(TraceLayer::new_for_http())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!("{} {}", method, uri.path()))
}
