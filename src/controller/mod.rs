use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{SimulationRequest, SimulationResult};
use crate::engine::{EngineError, EngineSelector, EngineStatus};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub controller: Arc<SimulationController>,
    pub started_at: Instant,
}

impl AppState {
    /// Start the engine selector described by `cfg`
    pub fn new(cfg: Config) -> Self {
        let selector = EngineSelector::from_config(cfg.grid, &cfg.engine);
        Self::with_selector(cfg, selector)
    }

    pub fn with_selector(cfg: Config, selector: EngineSelector) -> Self {
        Self {
            cfg,
            controller: Arc::new(SimulationController { selector }),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Request-facing wrapper around the engine selector
pub struct SimulationController {
    selector: EngineSelector,
}

impl SimulationController {
    pub fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult, EngineError> {
        info!(
            load_mw = request.load_mw,
            generation_mw = request.generation_mw,
            "running simulation"
        );

        let result = self
            .selector
            .compute(request.load_mw, request.generation_mw)
            .map_err(|e| {
                warn!(error = %e, "simulation failed");
                e
            })?;

        info!(
            stability_status = %result.stability_status,
            simulation_mode = %result.simulation_mode,
            power_imbalance_mw = result.power_imbalance_mw,
            "simulation completed"
        );
        Ok(result)
    }

    pub fn engine_status(&self) -> EngineStatus {
        self.selector.status()
    }

    pub fn reset_engine(&self) -> EngineStatus {
        let status = self.selector.reset();
        info!(
            native_available = status.native_available,
            mode = %status.mode,
            "engine selection reset"
        );
        status
    }

    pub fn shutdown(&self) {
        self.selector.shutdown();
    }
}
