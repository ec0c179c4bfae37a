//! [`JointModel`] – the six joint angles and the gripper flag.
//!
//! # Angle policy
//!
//! Angles are whole degrees in `[ANGLE_MIN_DEG, ANGLE_MAX_DEG]` = `[0, 180]`.
//! Requested values are real numbers (a slider position); they are rounded
//! to the nearest integer (ties away from zero) and then clamped into range.
//! `NaN` becomes 0, `+inf` becomes 180 and `-inf` becomes 0. A request is
//! never rejected for its angle, only for its joint index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ArmError;

/// Number of rotational joints on the arm.
pub const JOINT_COUNT: usize = 6;
/// Lowest legal joint angle in degrees (inclusive).
pub const ANGLE_MIN_DEG: i32 = 0;
/// Highest legal joint angle in degrees (inclusive).
pub const ANGLE_MAX_DEG: i32 = 180;

/// Joint angles plus gripper state.
///
/// Every stored angle lies within `[ANGLE_MIN_DEG, ANGLE_MAX_DEG]`; the
/// only way in is [`JointModel::set_angle`], which clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct JointModel {
    angles: [i32; JOINT_COUNT],
    /// `true` = closed.
    gripper_closed: bool,
}

impl JointModel {
    /// All joints at 0°, gripper open.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angles(&self) -> [i32; JOINT_COUNT] {
        self.angles
    }

    pub fn angle(&self, index: usize) -> Option<i32> {
        self.angles.get(index).copied()
    }

    pub fn gripper_closed(&self) -> bool {
        self.gripper_closed
    }

    /// `true` when every joint is at 0° and the gripper is open.
    pub fn is_home(&self) -> bool {
        *self == Self::default()
    }

    /// Round and clamp a requested angle into the legal range.
    pub fn clamp_angle(requested: f64) -> i32 {
        if requested.is_nan() {
            return ANGLE_MIN_DEG;
        }
        let rounded = requested.round();
        rounded.clamp(f64::from(ANGLE_MIN_DEG), f64::from(ANGLE_MAX_DEG)) as i32
    }

    /// Set joint `index` to the clamped `requested` angle and return the
    /// value actually stored.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidJoint`] when `index >= JOINT_COUNT`.
    pub fn set_angle(&mut self, index: usize, requested: f64) -> Result<i32, ArmError> {
        let slot = self
            .angles
            .get_mut(index)
            .ok_or(ArmError::InvalidJoint(index))?;
        *slot = Self::clamp_angle(requested);
        Ok(*slot)
    }

    /// Flip the gripper and return the new state (`true` = closed).
    pub fn toggle_gripper(&mut self) -> bool {
        self.gripper_closed = !self.gripper_closed;
        self.gripper_closed
    }

    /// Return to the initial configuration.
    pub fn home(&mut self) {
        *self = Self::default();
    }
}

/// Motion profile selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovementStyle {
    #[default]
    Normal,
    Precise,
    Rapid,
}

impl MovementStyle {
    pub fn description(self) -> &'static str {
        match self {
            MovementStyle::Normal => "Normal movement mode",
            MovementStyle::Precise => "Precise movement mode",
            MovementStyle::Rapid => "Rapid movement mode",
        }
    }
}

impl fmt::Display for MovementStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementStyle::Normal => write!(f, "normal"),
            MovementStyle::Precise => write!(f, "precise"),
            MovementStyle::Rapid => write!(f, "rapid"),
        }
    }
}

impl FromStr for MovementStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(MovementStyle::Normal),
            "precise" => Ok(MovementStyle::Precise),
            "rapid" => Ok(MovementStyle::Rapid),
            other => Err(format!("unknown movement style '{other}'")),
        }
    }
}
