//! `armctl-kinematics` – planar forward kinematics for the arm sketch.
//!
//! # Modules
//!
//! - [`chain`] – [`ChainConfig`][chain::ChainConfig] and the pure
//!   [`forward_kinematics`][chain::forward_kinematics] function that turns a
//!   joint model into the [`Pose`][armctl_types::Pose] a renderer draws.

pub mod chain;

pub use chain::{ChainConfig, ChainError, forward_kinematics};
