//! Native grid engine
//!
//! Evaluates frequency and voltage as one vector expression through a
//! `NativeSession`. The session is the shared native resource: it is opened
//! once, serialises calls behind a mutex and refuses work once closed.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::domain::GridConstants;

use super::{EngineError, EngineLauncher, GridEngine};

#[cfg(feature = "native")]
pub use imp::{NativeEngine, NativeSession};

/// Build the launcher the selector uses to (re)start the native engine.
///
/// Fails with `EngineUnavailable` when native support is disabled by
/// configuration or was not compiled in.
pub fn launcher(constants: GridConstants, cfg: EngineConfig) -> EngineLauncher {
    Box::new(move || {
        if !cfg.native_enabled {
            return Err(EngineError::EngineUnavailable(
                "native engine disabled by configuration".to_string(),
            ));
        }
        start(constants, &cfg)
    })
}

#[cfg(feature = "native")]
fn start(constants: GridConstants, cfg: &EngineConfig) -> Result<Arc<dyn GridEngine>, EngineError> {
    let engine = NativeEngine::start(constants)?;
    if cfg.self_test {
        engine.self_test()?;
        tracing::debug!("native engine self-test passed");
    }
    tracing::info!("native grid engine session opened");
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "native"))]
fn start(
    _constants: GridConstants,
    _cfg: &EngineConfig,
) -> Result<Arc<dyn GridEngine>, EngineError> {
    Err(EngineError::EngineUnavailable(
        "built without native engine support (enable the `native` feature)".to_string(),
    ))
}

#[cfg(feature = "native")]
mod imp {
    use nalgebra::Vector2;
    use parking_lot::Mutex;
    use tracing::warn;

    use crate::domain::{GridConstants, GridMetrics, SimulationMode, SimulationResult};
    use crate::engine::{ensure_finite, validate_inputs, EngineError, FallbackEngine, GridEngine};

    /// Inputs checked against the fallback engine before a session is trusted
    const SELF_TEST_PROBES: [(f64, f64); 10] = [
        (1000.0, 1000.0),
        (1000.0, 1050.0),
        (1000.0, 1080.0),
        (1000.0, 1150.0),
        (1100.0, 1000.0),
        (0.0, 100.0),
        (0.0, 0.0),
        (100.0, 100.0),
        (0.0, 10_000.0),
        (10_000.0, 0.0),
    ];

    /// Precomputed vectors for the `[frequency, voltage]` pair
    #[derive(Debug, Clone)]
    struct Kernel {
        sensitivity: Vector2<f64>,
        base: Vector2<f64>,
        lower: Vector2<f64>,
        upper: Vector2<f64>,
    }

    impl Kernel {
        fn new(c: &GridConstants) -> Self {
            Self {
                sensitivity: Vector2::new(
                    c.frequency_sensitivity_hz_per_mw,
                    c.voltage_sensitivity_pu_per_mw,
                ),
                base: Vector2::new(c.nominal_frequency_hz, c.voltage_base_pu),
                // Frequency is not bounded
                lower: Vector2::new(f64::NEG_INFINITY, c.voltage_min_pu),
                upper: Vector2::new(f64::INFINITY, c.voltage_max_pu),
            }
        }

        fn evaluate(&self, imbalance_mw: f64) -> (f64, Vector2<f64>) {
            let deviation = self.sensitivity * imbalance_mw;
            let level = (self.base + deviation).inf(&self.upper).sup(&self.lower);
            (deviation[0], level)
        }
    }

    enum SessionState {
        Open(Kernel),
        Closed,
    }

    /// Long-lived native handle. At most one call is in flight at a time.
    pub struct NativeSession {
        state: Mutex<SessionState>,
    }

    impl NativeSession {
        pub fn open(constants: &GridConstants) -> Result<Self, EngineError> {
            constants
                .validate()
                .map_err(EngineError::EngineUnavailable)?;
            Ok(Self {
                state: Mutex::new(SessionState::Open(Kernel::new(constants))),
            })
        }

        pub fn is_open(&self) -> bool {
            matches!(*self.state.lock(), SessionState::Open(_))
        }

        pub fn close(&self) {
            *self.state.lock() = SessionState::Closed;
        }

        /// Returns the frequency deviation and the `[frequency, voltage]` pair
        fn run(&self, imbalance_mw: f64) -> Result<(f64, Vector2<f64>), EngineError> {
            match &*self.state.lock() {
                SessionState::Open(kernel) => Ok(kernel.evaluate(imbalance_mw)),
                SessionState::Closed => Err(EngineError::EngineUnavailable(
                    "native session is closed".to_string(),
                )),
            }
        }
    }

    /// Grid engine backed by a native session
    pub struct NativeEngine {
        constants: GridConstants,
        session: NativeSession,
    }

    impl NativeEngine {
        pub fn start(constants: GridConstants) -> Result<Self, EngineError> {
            let session = NativeSession::open(&constants)?;
            Ok(Self { constants, session })
        }

        pub fn session(&self) -> &NativeSession {
            &self.session
        }

        /// Compare against the fallback engine on a fixed probe set
        pub fn self_test(&self) -> Result<(), EngineError> {
            let reference = FallbackEngine::new(self.constants);
            for (load_mw, generation_mw) in SELF_TEST_PROBES {
                let expected = reference.compute(load_mw, generation_mw)?;
                let actual = self.compute(load_mw, generation_mw)?;
                if !actual.same_metrics(&expected) {
                    warn!(load_mw, generation_mw, "native engine self-test mismatch");
                    return Err(EngineError::EngineUnavailable(format!(
                        "self-test mismatch at load={} MW, generation={} MW",
                        load_mw, generation_mw
                    )));
                }
            }
            Ok(())
        }
    }

    impl GridEngine for NativeEngine {
        fn mode(&self) -> SimulationMode {
            SimulationMode::Native
        }

        fn compute(
            &self,
            load_mw: f64,
            generation_mw: f64,
        ) -> Result<SimulationResult, EngineError> {
            validate_inputs(load_mw, generation_mw)?;

            let imbalance = generation_mw - load_mw;
            let (frequency_deviation, level) = self.session.run(imbalance)?;

            let metrics = GridMetrics {
                power_imbalance_mw: imbalance,
                frequency_deviation_hz: frequency_deviation,
                system_frequency_hz: level[0],
                voltage_pu: level[1],
                efficiency_percent: self.constants.efficiency_percent(load_mw, generation_mw),
            };
            ensure_finite(&metrics)?;

            Ok(SimulationResult::assemble(
                load_mw,
                generation_mw,
                metrics,
                &self.constants,
                SimulationMode::Native,
            ))
        }

        fn shutdown(&self) {
            self.session.close();
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::StabilityStatus;

        #[test]
        fn test_native_matches_fallback_on_probes() {
            let engine = NativeEngine::start(GridConstants::default()).unwrap();
            assert!(engine.self_test().is_ok());
        }

        #[test]
        fn test_native_tags_results() {
            let engine = NativeEngine::start(GridConstants::default()).unwrap();
            let r = engine.compute(1000.0, 1150.0).unwrap();
            assert_eq!(r.simulation_mode, SimulationMode::Native);
            assert_eq!(r.stability_status, StabilityStatus::Critical);
        }

        #[test]
        fn test_voltage_clamped_in_vector_kernel() {
            let engine = NativeEngine::start(GridConstants::default()).unwrap();
            assert_eq!(engine.compute(0.0, 20_000.0).unwrap().voltage_pu, 1.15);
            assert_eq!(engine.compute(20_000.0, 0.0).unwrap().voltage_pu, 0.85);
        }

        #[test]
        fn test_closed_session_is_unavailable() {
            let engine = NativeEngine::start(GridConstants::default()).unwrap();
            assert!(engine.session().is_open());
            engine.shutdown();
            assert!(!engine.session().is_open());

            let err = engine.compute(10.0, 10.0).unwrap_err();
            assert!(matches!(err, EngineError::EngineUnavailable(_)));
        }

        #[test]
        fn test_invalid_input_checked_before_session() {
            let engine = NativeEngine::start(GridConstants::default()).unwrap();
            engine.shutdown();
            let err = engine.compute(-1.0, 10.0).unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
        }

        #[test]
        fn test_session_rejects_invalid_constants() {
            let constants = GridConstants {
                voltage_min_pu: 2.0,
                ..Default::default()
            };
            assert!(matches!(
                NativeEngine::start(constants),
                Err(EngineError::EngineUnavailable(_))
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_configuration() {
        let launch = launcher(
            GridConstants::default(),
            EngineConfig {
                native_enabled: false,
                self_test: true,
            },
        );
        let err = launch().err().unwrap();
        assert_eq!(
            err,
            EngineError::EngineUnavailable("native engine disabled by configuration".to_string())
        );
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_launcher_starts_native_engine() {
        let launch = launcher(GridConstants::default(), EngineConfig::default());
        let engine = launch().unwrap();
        assert_eq!(engine.mode(), crate::domain::SimulationMode::Native);
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_launcher_without_native_support() {
        let launch = launcher(GridConstants::default(), EngineConfig::default());
        assert!(matches!(launch(), Err(EngineError::EngineUnavailable(_))));
    }
}
