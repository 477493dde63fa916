use anyhow::Result;
use grid_metrics_engine::{api, config, controller, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg.telemetry);

    let app_state = controller::AppState::new(cfg.clone());
    let engine = app_state.controller.engine_status();
    info!(
        native_available = engine.native_available,
        mode = %engine.mode,
        "grid metrics engine initialised"
    );

    let app = api::router(app_state.clone(), &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("server binding to 0.0.0.0 - the API will be reachable from the network");
    }

    info!(%addr, "starting grid metrics server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    app_state.controller.shutdown();
    warn!("shutdown complete");
    Ok(())
}
