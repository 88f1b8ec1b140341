//! Simulated on-chip temperature sensor.

use monitor_core::{Calibration, RawSample};

/// Deterministic wobble, in degrees, applied to successive samples.
const DRIFT_PATTERN: [f64; 8] = [0.0, 0.4, 0.8, 0.4, 0.0, -0.4, -0.8, -0.4];

/// Produces raw converter codes for a configurable ambient temperature.
#[derive(Clone, Debug)]
pub struct SimulatedSensor {
    ambient: f64,
    calibration: Calibration,
    step: usize,
}

impl SimulatedSensor {
    #[must_use]
    pub fn new(ambient: f64, calibration: Calibration) -> Self {
        Self {
            ambient,
            calibration,
            step: 0,
        }
    }

    /// Runs one conversion.
    pub fn sample(&mut self) -> RawSample {
        let drift = DRIFT_PATTERN[self.step % DRIFT_PATTERN.len()];
        self.step = self.step.wrapping_add(1);
        self.calibration.raw_for(self.ambient + drift)
    }
}
