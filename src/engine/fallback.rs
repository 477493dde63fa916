use crate::domain::{GridConstants, GridMetrics, SimulationMode, SimulationResult};

use super::{ensure_finite, validate_inputs, EngineError, GridEngine};

/// Pure-software engine. Stateless and always available.
#[derive(Debug, Clone, Default)]
pub struct FallbackEngine {
    constants: GridConstants,
}

impl FallbackEngine {
    pub fn new(constants: GridConstants) -> Self {
        Self { constants }
    }

    fn metrics(&self, load_mw: f64, generation_mw: f64) -> GridMetrics {
        let c = &self.constants;

        let imbalance = generation_mw - load_mw;

        let frequency_deviation = imbalance * c.frequency_sensitivity_hz_per_mw;
        let system_frequency = c.nominal_frequency_hz + frequency_deviation;

        let voltage = c.voltage_base_pu + imbalance * c.voltage_sensitivity_pu_per_mw;

        GridMetrics {
            power_imbalance_mw: imbalance,
            frequency_deviation_hz: frequency_deviation,
            system_frequency_hz: system_frequency,
            voltage_pu: c.clamp_voltage(voltage),
            efficiency_percent: c.efficiency_percent(load_mw, generation_mw),
        }
    }
}

impl GridEngine for FallbackEngine {
    fn mode(&self) -> SimulationMode {
        SimulationMode::Fallback
    }

    fn compute(&self, load_mw: f64, generation_mw: f64) -> Result<SimulationResult, EngineError> {
        validate_inputs(load_mw, generation_mw)?;
        let metrics = self.metrics(load_mw, generation_mw);
        ensure_finite(&metrics)?;
        Ok(SimulationResult::assemble(
            load_mw,
            generation_mw,
            metrics,
            &self.constants,
            SimulationMode::Fallback,
        ))
    }
}
