//! Serial-chain forward kinematics in the drawing plane.
//!
//! The chain is four rigid segments: the base radius followed by three
//! links. Each joint's direction is the **cumulative** sum of the joint
//! angles up to and including it, so the chain composes additively:
//!
//! ```text
//! p0 = base
//! p1 = p0 + base_radius ∠ θ0
//! p2 = p1 + L0 ∠ (θ0 + θ1)
//! p3 = p2 + L1 ∠ (θ0 + θ1 + θ2)
//! p4 = p3 + L2 ∠ (θ0 + θ1 + θ2 + θ3)     (end effector)
//! ```
//!
//! The two gripper jaws leave `p4` at `Σθ ± 90°` where `Σθ` is the sum of
//! all six joint angles; their length is the jaw half-width, narrower when
//! the gripper is closed.
//!
//! Angles are in degrees and converted to radians before use. The y axis is
//! **inverted** (screen convention): `x' = x + L·cos θ`, `y' = y − L·sin θ`,
//! so a positive angle points up the screen.
//!
//! # Example
//!
//! ```
//! use armctl_kinematics::{ChainConfig, forward_kinematics};
//!
//! let config = ChainConfig::default();
//! let pose = forward_kinematics(&[0; 6], false, &config);
//!
//! // Fully stretched to the right: 50 + 80 + 120 + 80 px from the base.
//! assert!((pose.end_effector.x - (config.base.x + 330.0)).abs() < 1e-9);
//! assert!((pose.end_effector.y - config.base.y).abs() < 1e-9);
//! ```

use armctl_types::{JOINT_COUNT, Point2, Pose};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating a [`ChainConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("segment '{name}' has invalid length {value}")]
    InvalidLength { name: &'static str, value: f64 },
    #[error("closed jaw width {closed} exceeds open jaw width {open}")]
    JawWidthOrder { open: f64, closed: f64 },
}

/// Fixed geometry of the arm sketch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Anchor of the arm in screen coordinates.
    pub base: Point2,
    /// Length of the first segment, swept by joint 0.
    pub base_radius: f64,
    /// Lengths of the three links after the base segment.
    pub link_lengths: [f64; 3],
    /// Jaw half-width while open.
    pub jaw_open_width: f64,
    /// Jaw half-width while closed.
    pub jaw_closed_width: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            // 600×400 canvas, base centred 50 px above the bottom edge.
            base: Point2::new(300.0, 350.0),
            base_radius: 50.0,
            link_lengths: [80.0, 120.0, 80.0],
            jaw_open_width: 60.0,
            jaw_closed_width: 30.0,
        }
    }
}

impl ChainConfig {
    /// Check that every length is finite and non-negative and that the jaws
    /// close narrower than they open.
    pub fn validate(&self) -> Result<(), ChainError> {
        let named = [
            ("base_radius", self.base_radius),
            ("link_0", self.link_lengths[0]),
            ("link_1", self.link_lengths[1]),
            ("link_2", self.link_lengths[2]),
            ("jaw_open_width", self.jaw_open_width),
            ("jaw_closed_width", self.jaw_closed_width),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ChainError::InvalidLength { name, value });
            }
        }
        if self.jaw_closed_width > self.jaw_open_width {
            return Err(ChainError::JawWidthOrder {
                open: self.jaw_open_width,
                closed: self.jaw_closed_width,
            });
        }
        Ok(())
    }

    /// Jaw half-width for the given gripper state.
    pub fn jaw_width(&self, gripper_closed: bool) -> f64 {
        if gripper_closed {
            self.jaw_closed_width
        } else {
            self.jaw_open_width
        }
    }

    /// Distance from the base to the end effector when fully stretched.
    pub fn reach(&self) -> f64 {
        self.base_radius + self.link_lengths.iter().sum::<f64>()
    }
}

/// Compute the pose of the arm for `joints` (degrees).
///
/// Pure: the same inputs always give the same output.
pub fn forward_kinematics(
    joints: &[i32; JOINT_COUNT],
    gripper_closed: bool,
    config: &ChainConfig,
) -> Pose {
    let radians: [f64; JOINT_COUNT] = std::array::from_fn(|i| f64::from(joints[i]).to_radians());

    let segments = [
        config.base_radius,
        config.link_lengths[0],
        config.link_lengths[1],
        config.link_lengths[2],
    ];

    let mut positions = [config.base; 5];
    let mut heading = 0.0;
    for (i, length) in segments.iter().enumerate() {
        heading += radians[i];
        positions[i + 1] = positions[i].project(*length, heading);
    }

    let end_effector = positions[4];
    let jaw_heading: f64 = radians.iter().sum();
    let width = config.jaw_width(gripper_closed);
    let jaw_tips = [
        end_effector.project(width, jaw_heading + std::f64::consts::FRAC_PI_2),
        end_effector.project(width, jaw_heading - std::f64::consts::FRAC_PI_2),
    ];

    Pose {
        joint_positions: positions,
        end_effector,
        jaw_tips,
    }
}
