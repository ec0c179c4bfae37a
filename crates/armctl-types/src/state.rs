//! [`SystemState`] – the single system-wide supervisory state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supervisory state of the arm. Exactly one instance exists, owned by the
/// supervisor; it starts as [`SystemState::Off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemState {
    #[default]
    Off,
    Ready,
    Running,
    Paused,
    /// Sticky fault state. Left only through an explicit `clear_fault`.
    Emergency,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Off => "off",
            SystemState::Ready => "ready",
            SystemState::Running => "running",
            SystemState::Paused => "paused",
            SystemState::Emergency => "emergency",
        }
    }

    /// Status-line label shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            SystemState::Off => "System off",
            SystemState::Ready => "System ready",
            SystemState::Running => "System running",
            SystemState::Paused => "System paused",
            SystemState::Emergency => "EMERGENCY STOP!",
        }
    }

    /// Colour of the status-line label.
    pub fn label_color(self) -> &'static str {
        match self {
            SystemState::Off | SystemState::Emergency => "red",
            SystemState::Ready | SystemState::Running => "green",
            SystemState::Paused => "orange",
        }
    }

    /// Colour of the small state indicator drawn next to the arm.
    pub fn indicator_color(self) -> &'static str {
        match self {
            SystemState::Off => "gray",
            SystemState::Ready => "yellow",
            SystemState::Running => "green",
            SystemState::Paused => "orange",
            SystemState::Emergency => "red",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
