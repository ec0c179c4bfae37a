//! Plain geometry consumed by the renderer.
//!
//! Coordinates are in screen convention: x grows to the right, y grows
//! downward.

use serde::{Deserialize, Serialize};

use crate::joint::{JOINT_COUNT, MovementStyle};
use crate::state::SystemState;

/// A point in the 2-D drawing plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset by `length` along `angle_rad`, with y inverted.
    pub fn project(self, length: f64, angle_rad: f64) -> Self {
        Self::new(
            self.x + length * angle_rad.cos(),
            self.y - length * angle_rad.sin(),
        )
    }

    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Result of forward kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Base point followed by the four joint points, in chain order.
    pub joint_positions: [Point2; 5],
    pub end_effector: Point2,
    /// Tips of the two gripper jaws (+90° side first).
    pub jaw_tips: [Point2; 2],
}

/// Everything a render surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub joint_positions: [Point2; 5],
    pub end_effector: Point2,
    pub jaw_tips: [Point2; 2],
    pub gripper_closed: bool,
    pub system_state: SystemState,
    pub joint_angles: [i32; JOINT_COUNT],
    pub movement_style: MovementStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_inverts_y() {
        let p = Point2::new(0.0, 0.0).project(10.0, std::f64::consts::FRAC_PI_2);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y + 10.0).abs() < 1e-9);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
    }
}
