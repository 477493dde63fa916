//! Grid metrics engines
//!
//! Two realizations compute the same metrics: [`FallbackEngine`] (scalar,
//! always available) and the nalgebra-backed `NativeEngine` that runs inside
//! a long-lived session. [`EngineSelector`] picks one at start-up.

pub mod fallback;
pub mod native;
pub mod selector;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{GridMetrics, SimulationMode, SimulationResult};

pub use fallback::FallbackEngine;
#[cfg(feature = "native")]
pub use native::{NativeEngine, NativeSession};
pub use selector::{EngineLauncher, EngineSelector};

/// Engine-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("Internal computation error: {0}")]
    InternalComputation(String),
}

/// One realization of the grid metrics computation
#[cfg_attr(test, mockall::automock)]
pub trait GridEngine: Send + Sync {
    /// Tag stamped on every result this engine produces
    fn mode(&self) -> SimulationMode;

    fn compute(&self, load_mw: f64, generation_mw: f64) -> Result<SimulationResult, EngineError>;

    /// Release any resources held by the engine. Later calls may fail.
    fn shutdown(&self) {}
}

/// Which realization currently answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub native_available: bool,
    pub mode: SimulationMode,
}

/// Both inputs must be finite and non-negative
pub fn validate_inputs(load_mw: f64, generation_mw: f64) -> Result<(), EngineError> {
    for (name, value) in [("load_mw", load_mw), ("generation_mw", generation_mw)] {
        if !value.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "{} must be a finite number, got {}",
                name, value
            )));
        }
        if value < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "{} must be non-negative, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

fn ensure_finite(metrics: &GridMetrics) -> Result<(), EngineError> {
    let fields = [
        ("power_imbalance_mw", metrics.power_imbalance_mw),
        ("frequency_deviation_hz", metrics.frequency_deviation_hz),
        ("system_frequency_hz", metrics.system_frequency_hz),
        ("voltage_pu", metrics.voltage_pu),
        ("efficiency_percent", metrics.efficiency_percent),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, value)) => Err(EngineError::InternalComputation(format!(
            "{} evaluated to {}",
            name, value
        ))),
        None => Ok(()),
    }
}
