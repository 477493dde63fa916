use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use validator::Validate;

/// Physical constants of the single-bus grid model.
///
/// One value is built at start-up and passed by reference to every engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConstants {
    /// Nominal system frequency in Hz (60 Hz, North America)
    pub nominal_frequency_hz: f64,
    /// Frequency change per MW of imbalance
    pub frequency_sensitivity_hz_per_mw: f64,
    /// Imbalance still considered stable, in MW
    pub stability_threshold_mw: f64,
    /// Voltage at zero imbalance, per-unit
    pub voltage_base_pu: f64,
    /// Voltage change per MW of imbalance, per-unit
    pub voltage_sensitivity_pu_per_mw: f64,
    pub voltage_min_pu: f64,
    pub voltage_max_pu: f64,
    pub efficiency_cap_percent: f64,
}

impl Default for GridConstants {
    fn default() -> Self {
        Self {
            nominal_frequency_hz: 60.0,
            frequency_sensitivity_hz_per_mw: 0.0001,
            stability_threshold_mw: 50.0,
            voltage_base_pu: 1.0,
            voltage_sensitivity_pu_per_mw: 0.00005,
            voltage_min_pu: 0.85,
            voltage_max_pu: 1.15,
            efficiency_cap_percent: 100.0,
        }
    }
}

impl GridConstants {
    /// Reject constant sets the engines cannot work with
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("nominal_frequency_hz", self.nominal_frequency_hz),
            ("frequency_sensitivity_hz_per_mw", self.frequency_sensitivity_hz_per_mw),
            ("stability_threshold_mw", self.stability_threshold_mw),
            ("voltage_base_pu", self.voltage_base_pu),
            ("voltage_sensitivity_pu_per_mw", self.voltage_sensitivity_pu_per_mw),
            ("voltage_min_pu", self.voltage_min_pu),
            ("voltage_max_pu", self.voltage_max_pu),
            ("efficiency_cap_percent", self.efficiency_cap_percent),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("grid constant {} must be finite", name));
        }

        if self.nominal_frequency_hz <= 0.0 {
            return Err("Nominal frequency must be positive".to_string());
        }
        if self.stability_threshold_mw < 0.0 {
            return Err("Stability threshold cannot be negative".to_string());
        }
        if self.voltage_min_pu > self.voltage_max_pu {
            return Err(format!(
                "Voltage bounds inverted: min {} pu > max {} pu",
                self.voltage_min_pu, self.voltage_max_pu
            ));
        }
        if self.efficiency_cap_percent <= 0.0 {
            return Err("Efficiency cap must be positive".to_string());
        }

        Ok(())
    }

    /// Pin a per-unit voltage to the configured band
    pub fn clamp_voltage(&self, voltage_pu: f64) -> f64 {
        self.voltage_min_pu.max(self.voltage_max_pu.min(voltage_pu))
    }

    /// Load served per unit of generation, in percent.
    ///
    /// Zero generation yields 0 %, including the balanced (0, 0) case.
    pub fn efficiency_percent(&self, load_mw: f64, generation_mw: f64) -> f64 {
        if generation_mw > 0.0 {
            (load_mw / generation_mw * 100.0).min(self.efficiency_cap_percent)
        } else {
            0.0
        }
    }
}

/// Stability classification of the current power balance
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StabilityStatus {
    Stable,
    Warning,
    Critical,
}

impl StabilityStatus {
    /// Classify an imbalance. Boundaries fall into the more stable bucket.
    pub fn classify(imbalance_mw: f64, constants: &GridConstants) -> Self {
        let magnitude = imbalance_mw.abs();
        if magnitude <= constants.stability_threshold_mw {
            StabilityStatus::Stable
        } else if magnitude <= constants.stability_threshold_mw * 2.0 {
            StabilityStatus::Warning
        } else {
            StabilityStatus::Critical
        }
    }

    pub fn index(&self) -> f64 {
        match self {
            StabilityStatus::Stable => 1.0,
            StabilityStatus::Warning => 0.5,
            StabilityStatus::Critical => 0.0,
        }
    }
}

/// Operator advisory attached to every result.
///
/// Serialized as its fixed message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
pub enum Advisory {
    #[serde(rename = "System operating within normal parameters.")]
    #[strum(to_string = "System operating within normal parameters.")]
    Normal,
    #[serde(rename = "WARNING: Power imbalance detected. System approaching instability.")]
    #[strum(to_string = "WARNING: Power imbalance detected. System approaching instability.")]
    ApproachingInstability,
    #[serde(rename = "CRITICAL: Excess generation detected. Reduce generation or increase load.")]
    #[strum(to_string = "CRITICAL: Excess generation detected. Reduce generation or increase load.")]
    ExcessGeneration,
    #[serde(rename = "CRITICAL: Load exceeds generation. Increase generation or shed load.")]
    #[strum(to_string = "CRITICAL: Load exceeds generation. Increase generation or shed load.")]
    LoadExceedsGeneration,
}

impl Advisory {
    pub fn select(status: StabilityStatus, imbalance_mw: f64) -> Self {
        match status {
            StabilityStatus::Critical if imbalance_mw > 0.0 => Advisory::ExcessGeneration,
            StabilityStatus::Critical => Advisory::LoadExceedsGeneration,
            StabilityStatus::Warning => Advisory::ApproachingInstability,
            StabilityStatus::Stable => Advisory::Normal,
        }
    }

    pub fn message(&self) -> &'static str {
        self.into()
    }
}

/// Which engine realization produced a result
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationMode {
    Native,
    Fallback,
}

/// Simulation input as received from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct SimulationRequest {
    /// System load in MW
    #[validate(range(
        min = 0.0,
        max = 100000.0,
        message = "must be between 0 and 100,000 MW"
    ))]
    pub load_mw: f64,
    /// System generation in MW
    #[validate(range(
        min = 0.0,
        max = 100000.0,
        message = "must be between 0 and 100,000 MW"
    ))]
    pub generation_mw: f64,
}

/// Numeric block computed by an engine kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub power_imbalance_mw: f64,
    pub frequency_deviation_hz: f64,
    pub system_frequency_hz: f64,
    /// Already clamped to the voltage band
    pub voltage_pu: f64,
    pub efficiency_percent: f64,
}

/// Outcome of one simulation call. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub timestamp: DateTime<Utc>,
    pub load_mw: f64,
    pub generation_mw: f64,
    pub power_imbalance_mw: f64,
    pub system_frequency_hz: f64,
    pub frequency_deviation_hz: f64,
    pub voltage_pu: f64,
    pub stability_status: StabilityStatus,
    pub stability_index: f64,
    pub efficiency_percent: f64,
    pub warning: Advisory,
    pub simulation_mode: SimulationMode,
}

impl SimulationResult {
    /// Apply the stability policy to a kernel's metrics and stamp the result
    pub fn assemble(
        load_mw: f64,
        generation_mw: f64,
        metrics: GridMetrics,
        constants: &GridConstants,
        mode: SimulationMode,
    ) -> Self {
        let status = StabilityStatus::classify(metrics.power_imbalance_mw, constants);
        Self {
            timestamp: Utc::now(),
            load_mw,
            generation_mw,
            power_imbalance_mw: metrics.power_imbalance_mw,
            system_frequency_hz: metrics.system_frequency_hz,
            frequency_deviation_hz: metrics.frequency_deviation_hz,
            voltage_pu: metrics.voltage_pu,
            stability_status: status,
            stability_index: status.index(),
            efficiency_percent: metrics.efficiency_percent,
            warning: Advisory::select(status, metrics.power_imbalance_mw),
            simulation_mode: mode,
        }
    }

    /// True when every computed field matches `other` exactly.
    ///
    /// `timestamp` and `simulation_mode` are ignored.
    pub fn same_metrics(&self, other: &SimulationResult) -> bool {
        self.load_mw.to_bits() == other.load_mw.to_bits()
            && self.generation_mw.to_bits() == other.generation_mw.to_bits()
            && self.power_imbalance_mw.to_bits() == other.power_imbalance_mw.to_bits()
            && self.system_frequency_hz.to_bits() == other.system_frequency_hz.to_bits()
            && self.frequency_deviation_hz.to_bits() == other.frequency_deviation_hz.to_bits()
            && self.voltage_pu.to_bits() == other.voltage_pu.to_bits()
            && self.stability_status == other.stability_status
            && self.stability_index.to_bits() == other.stability_index.to_bits()
            && self.efficiency_percent.to_bits() == other.efficiency_percent.to_bits()
            && self.warning == other.warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants_are_valid() {
        let constants = GridConstants::default();
        assert!(constants.validate().is_ok());
        assert_eq!(constants.nominal_frequency_hz, 60.0);
        assert_eq!(constants.stability_threshold_mw, 50.0);
    }

    #[test]
    fn test_inverted_voltage_band_rejected() {
        let constants = GridConstants {
            voltage_min_pu: 1.2,
            voltage_max_pu: 0.9,
            ..Default::default()
        };
        assert!(constants.validate().is_err());
    }

    #[test]
    fn test_non_finite_constant_rejected() {
        let constants = GridConstants {
            frequency_sensitivity_hz_per_mw: f64::NAN,
            ..Default::default()
        };
        let err = constants.validate().unwrap_err();
        assert!(err.contains("frequency_sensitivity_hz_per_mw"));
    }

    #[test]
    fn test_voltage_clamp() {
        let constants = GridConstants::default();
        assert_eq!(constants.clamp_voltage(0.5), 0.85);
        assert_eq!(constants.clamp_voltage(1.5), 1.15);
        assert_eq!(constants.clamp_voltage(1.0025), 1.0025);
    }

    #[test]
    fn test_efficiency_policy() {
        let constants = GridConstants::default();
        assert_eq!(constants.efficiency_percent(0.0, 100.0), 0.0);
        assert_eq!(constants.efficiency_percent(100.0, 100.0), 100.0);
        assert_eq!(constants.efficiency_percent(0.0, 0.0), 0.0);
        assert_eq!(constants.efficiency_percent(200.0, 100.0), 100.0);
        assert_eq!(constants.efficiency_percent(50.0, 0.0), 0.0);
    }

    #[test]
    fn test_classification_boundaries() {
        let c = GridConstants::default();
        assert_eq!(StabilityStatus::classify(50.0, &c), StabilityStatus::Stable);
        assert_eq!(StabilityStatus::classify(-50.0, &c), StabilityStatus::Stable);
        assert_eq!(StabilityStatus::classify(50.0001, &c), StabilityStatus::Warning);
        assert_eq!(StabilityStatus::classify(100.0, &c), StabilityStatus::Warning);
        assert_eq!(StabilityStatus::classify(-100.0, &c), StabilityStatus::Warning);
        assert_eq!(StabilityStatus::classify(100.0001, &c), StabilityStatus::Critical);
    }

    #[test]
    fn test_stability_index() {
        assert_eq!(StabilityStatus::Stable.index(), 1.0);
        assert_eq!(StabilityStatus::Warning.index(), 0.5);
        assert_eq!(StabilityStatus::Critical.index(), 0.0);
    }

    #[test]
    fn test_advisory_selection() {
        assert_eq!(
            Advisory::select(StabilityStatus::Critical, 150.0),
            Advisory::ExcessGeneration
        );
        assert_eq!(
            Advisory::select(StabilityStatus::Critical, -150.0),
            Advisory::LoadExceedsGeneration
        );
        assert_eq!(
            Advisory::select(StabilityStatus::Warning, -80.0),
            Advisory::ApproachingInstability
        );
        assert_eq!(Advisory::select(StabilityStatus::Stable, 0.0), Advisory::Normal);
    }

    #[test]
    fn test_status_and_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&StabilityStatus::Critical).unwrap(),
            "\"CRITICAL\""
        );
        assert_eq!(StabilityStatus::Warning.to_string(), "WARNING");
        assert_eq!(
            serde_json::to_string(&SimulationMode::Fallback).unwrap(),
            "\"FALLBACK\""
        );
        assert_eq!("NATIVE".parse::<SimulationMode>().unwrap(), SimulationMode::Native);
    }

    #[test]
    fn test_advisory_serializes_as_message() {
        let json = serde_json::to_string(&Advisory::Normal).unwrap();
        assert_eq!(json, "\"System operating within normal parameters.\"");

        for advisory in [
            Advisory::Normal,
            Advisory::ApproachingInstability,
            Advisory::ExcessGeneration,
            Advisory::LoadExceedsGeneration,
        ] {
            assert_eq!(
                serde_json::to_value(advisory).unwrap(),
                serde_json::Value::from(advisory.message())
            );
            assert_eq!(advisory.to_string(), advisory.message());
        }
        assert_eq!(
            Advisory::LoadExceedsGeneration.message(),
            "CRITICAL: Load exceeds generation. Increase generation or shed load."
        );
    }

    #[test]
    fn test_request_limits() {
        let ok = SimulationRequest { load_mw: 1000.0, generation_mw: 100_000.0 };
        assert!(ok.validate().is_ok());

        let negative = SimulationRequest { load_mw: -1.0, generation_mw: 10.0 };
        assert!(negative.validate().is_err());

        let too_large = SimulationRequest { load_mw: 10.0, generation_mw: 100_000.5 };
        let errors = too_large.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("generation_mw"));
    }

    #[test]
    fn test_same_metrics_ignores_mode_and_timestamp() {
        let c = GridConstants::default();
        let metrics = GridMetrics {
            power_imbalance_mw: 0.0,
            frequency_deviation_hz: 0.0,
            system_frequency_hz: 60.0,
            voltage_pu: 1.0,
            efficiency_percent: 100.0,
        };
        let a = SimulationResult::assemble(10.0, 10.0, metrics, &c, SimulationMode::Native);
        let b = SimulationResult::assemble(10.0, 10.0, metrics, &c, SimulationMode::Fallback);
        assert!(a.same_metrics(&b));
    }
}
