//! Synthetic motor telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::joint::{JOINT_COUNT, JointModel};

/// Encoder ticks per degree of joint rotation.
pub const TICKS_PER_DEGREE: i32 = 10;

/// One reading of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub motor: usize,
    pub temperature_c: f64,
    pub position_ticks: i32,
    pub position_rad: f64,
    /// Mirrors the joint model angle.
    pub position_deg: i32,
}

impl TelemetrySample {
    /// Derive the position fields from a joint angle.
    pub fn from_angle(motor: usize, angle_deg: i32, temperature_c: f64) -> Self {
        Self {
            motor,
            temperature_c,
            position_ticks: angle_deg * TICKS_PER_DEGREE,
            position_rad: f64::from(angle_deg).to_radians(),
            position_deg: angle_deg,
        }
    }
}

/// The set of six samples produced by one sampling tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Monotonic per-sampler tick counter.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub samples: [TelemetrySample; JOINT_COUNT],
}

impl TelemetryFrame {
    /// Build a frame from the joint model and one temperature per motor.
    pub fn from_model(
        sequence: u64,
        model: &JointModel,
        temperatures_c: [f64; JOINT_COUNT],
    ) -> Self {
        let angles = model.angles();
        Self {
            sequence,
            captured_at: Utc::now(),
            samples: std::array::from_fn(|i| {
                TelemetrySample::from_angle(i, angles[i], temperatures_c[i])
            }),
        }
    }

    /// The hottest motor's sample.
    pub fn hottest(&self) -> &TelemetrySample {
        self.samples
            .iter()
            .max_by(|a, b| a.temperature_c.total_cmp(&b.temperature_c))
            .unwrap_or(&self.samples[0])
    }

    pub fn max_temperature(&self) -> f64 {
        self.hottest().temperature_c
    }
}
