//! Simulated sensors for running the full stack without hardware.
//!
//! # Example
//!
//! ```rust
//! use armctl_hal::{SimThermalSensor, TemperatureSensor};
//!
//! let mut sensor = SimThermalSensor::seeded(25.0, 45.0, 7).unwrap();
//! let temps = sensor.read_all().unwrap();
//! assert!(temps.iter().all(|t| (25.0..=45.0).contains(t)));
//! ```

use std::collections::VecDeque;

use armctl_types::{ArmError, JOINT_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::sensor::TemperatureSensor;

// ────────────────────────────────────────────────────────────────────────────
// Random thermal sensor
// ────────────────────────────────────────────────────────────────────────────

/// Draws each motor's temperature independently and uniformly from
/// `[min_c, max_c]` on every read. No thermal inertia.
pub struct SimThermalSensor {
    min_c: f64,
    max_c: f64,
    rng: StdRng,
}

impl SimThermalSensor {
    /// Seed from the operating system. Bounds are swapped if reversed.
    ///
    /// # Errors
    ///
    /// [`ArmError::HardwareFault`] when either bound is not finite.
    pub fn new(min_c: f64, max_c: f64) -> Result<Self, ArmError> {
        Self::with_rng(min_c, max_c, StdRng::from_os_rng())
    }

    /// Reproducible sequence for tests.
    pub fn seeded(min_c: f64, max_c: f64, seed: u64) -> Result<Self, ArmError> {
        Self::with_rng(min_c, max_c, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min_c: f64, max_c: f64, rng: StdRng) -> Result<Self, ArmError> {
        if !min_c.is_finite() || !max_c.is_finite() {
            return Err(ArmError::HardwareFault(format!(
                "temperature bounds must be finite, got [{min_c}, {max_c}]"
            )));
        }
        let (min_c, max_c) = if min_c <= max_c { (min_c, max_c) } else { (max_c, min_c) };
        Ok(Self { min_c, max_c, rng })
    }
}

impl TemperatureSensor for SimThermalSensor {
    fn id(&self) -> &str {
        "sim_thermal"
    }

    fn read_all(&mut self) -> Result<[f64; JOINT_COUNT], ArmError> {
        let temps: [f64; JOINT_COUNT] =
            std::array::from_fn(|_| self.rng.random_range(self.min_c..=self.max_c));
        trace!(?temps, "simulated temperatures");
        Ok(temps)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted sensor
// ────────────────────────────────────────────────────────────────────────────

/// Replays queued readings in order, then repeats `fallback` forever.
pub struct ScriptedSensor {
    queued: VecDeque<[f64; JOINT_COUNT]>,
    fallback: [f64; JOINT_COUNT],
}

impl ScriptedSensor {
    pub fn new(fallback: [f64; JOINT_COUNT]) -> Self {
        Self {
            queued: VecDeque::new(),
            fallback,
        }
    }

    /// Queue one reading (builder-style).
    pub fn then(mut self, reading: [f64; JOINT_COUNT]) -> Self {
        self.queued.push_back(reading);
        self
    }
}

impl TemperatureSensor for ScriptedSensor {
    fn id(&self) -> &str {
        "scripted"
    }

    fn read_all(&mut self) -> Result<[f64; JOINT_COUNT], ArmError> {
        Ok(self.queued.pop_front().unwrap_or(self.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_readings_stay_in_range() {
        let mut sensor = SimThermalSensor::seeded(25.0, 45.0, 42).unwrap();
        for _ in 0..200 {
            let temps = sensor.read_all().unwrap();
            assert!(temps.iter().all(|t| (25.0..=45.0).contains(t)));
        }
    }

    #[test]
    fn sim_seeded_is_reproducible() {
        let mut a = SimThermalSensor::seeded(25.0, 45.0, 9).unwrap();
        let mut b = SimThermalSensor::seeded(25.0, 45.0, 9).unwrap();
        assert_eq!(a.read_all().unwrap(), b.read_all().unwrap());
    }

    #[test]
    fn sim_reversed_bounds_are_swapped() {
        let mut sensor = SimThermalSensor::seeded(45.0, 25.0, 1).unwrap();
        let temps = sensor.read_all().unwrap();
        assert!(temps.iter().all(|t| (25.0..=45.0).contains(t)));
    }

    #[test]
    fn sim_rejects_non_finite_bounds() {
        for (min, max) in [(25.0, f64::INFINITY), (f64::NAN, 45.0), (f64::NEG_INFINITY, 45.0)] {
            let err = SimThermalSensor::seeded(min, max, 3).err();
            assert!(
                matches!(err, Some(ArmError::HardwareFault(_))),
                "bounds [{min}, {max}] accepted"
            );
        }
    }

    #[test]
    fn scripted_replays_then_falls_back() {
        let mut sensor = ScriptedSensor::new([30.0; JOINT_COUNT])
            .then([70.0; JOINT_COUNT])
            .then([50.0; JOINT_COUNT]);
        assert_eq!(sensor.read_all().unwrap(), [70.0; JOINT_COUNT]);
        assert_eq!(sensor.read_all().unwrap(), [50.0; JOINT_COUNT]);
        assert_eq!(sensor.read_all().unwrap(), [30.0; JOINT_COUNT]);
        assert_eq!(sensor.read_all().unwrap(), [30.0; JOINT_COUNT]);
    }
}
