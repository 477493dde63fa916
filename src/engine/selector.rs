use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::domain::{GridConstants, SimulationMode, SimulationResult};

use super::{native, validate_inputs, EngineError, EngineStatus, FallbackEngine, GridEngine};

/// Starts (or restarts) the native engine
pub type EngineLauncher =
    Box<dyn Fn() -> Result<Arc<dyn GridEngine>, EngineError> + Send + Sync>;

/// Routes calls to the native engine when it started, to the fallback otherwise.
///
/// The routing decision is made once at start-up and again on [`reset`].
///
/// [`reset`]: EngineSelector::reset
pub struct EngineSelector {
    fallback: FallbackEngine,
    launcher: EngineLauncher,
    native: RwLock<Option<Arc<dyn GridEngine>>>,
    runtime_fault_logged: AtomicBool,
}

impl EngineSelector {
    /// Try the native engine once and settle on a mode
    pub fn start(constants: GridConstants, launcher: EngineLauncher) -> Self {
        let selector = Self {
            fallback: FallbackEngine::new(constants),
            launcher,
            native: RwLock::new(None),
            runtime_fault_logged: AtomicBool::new(false),
        };
        selector.attach_native();
        selector
    }

    pub fn from_config(constants: GridConstants, cfg: &EngineConfig) -> Self {
        Self::start(constants, native::launcher(constants, cfg.clone()))
    }

    /// Fallback only, no native attempt
    pub fn fallback_only(constants: GridConstants) -> Self {
        Self::start(
            constants,
            Box::new(|| {
                Err(EngineError::EngineUnavailable(
                    "native engine not requested".to_string(),
                ))
            }),
        )
    }

    fn attach_native(&self) -> EngineStatus {
        let attached = match (self.launcher)() {
            Ok(engine) => {
                info!(mode = %engine.mode(), "grid engine ready");
                Some(engine)
            }
            Err(e) => {
                warn!(error = %e, "native grid engine unavailable, using fallback simulation mode");
                None
            }
        };

        let previous = std::mem::replace(&mut *self.native.write(), attached);
        if let Some(engine) = previous {
            engine.shutdown();
        }
        self.runtime_fault_logged.store(false, Ordering::Relaxed);

        self.status()
    }

    /// Shut down the current native engine and try to start a fresh one
    pub fn reset(&self) -> EngineStatus {
        info!("re-attempting native grid engine start-up");
        self.attach_native()
    }

    pub fn status(&self) -> EngineStatus {
        let native_available = self.native.read().is_some();
        EngineStatus {
            native_available,
            mode: if native_available {
                SimulationMode::Native
            } else {
                SimulationMode::Fallback
            },
        }
    }

    /// Compute with the active engine.
    ///
    /// A native `EngineUnavailable` failure is answered by the fallback for
    /// that call; every other error is returned unchanged.
    pub fn compute(&self, load_mw: f64, generation_mw: f64) -> Result<SimulationResult, EngineError> {
        validate_inputs(load_mw, generation_mw)?;

        let native = self.native.read().clone();
        if let Some(engine) = native {
            match engine.compute(load_mw, generation_mw) {
                Err(EngineError::EngineUnavailable(reason)) => {
                    if !self.runtime_fault_logged.swap(true, Ordering::Relaxed) {
                        warn!(%reason, "native grid engine call failed, answering from fallback");
                    }
                }
                other => return other,
            }
        }

        self.fallback.compute(load_mw, generation_mw)
    }

    /// Release the native engine. Later calls use the fallback.
    pub fn shutdown(&self) {
        if let Some(engine) = self.native.write().take() {
            engine.shutdown();
            info!("native grid engine shut down");
        }
    }
}
