//! `armctl-types` – shared vocabulary of the arm control stack.
//!
//! Every other `armctl-*` crate speaks in these types: the joint model the
//! supervisor protects, the system state machine's states, telemetry frames,
//! persisted position records, render snapshots, and the global [`ArmError`].

pub mod event;
pub mod geometry;
pub mod joint;
pub mod record;
pub mod state;
pub mod telemetry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use event::{AuditLevel, AuditRecord, Event, EventPayload};
pub use geometry::{Point2, Pose, RenderSnapshot};
pub use joint::{ANGLE_MAX_DEG, ANGLE_MIN_DEG, JOINT_COUNT, JointModel, MovementStyle};
pub use record::PositionRecord;
pub use state::SystemState;
pub use telemetry::{TelemetryFrame, TelemetrySample};

/// Display tone attached to every piece of operator feedback.
///
/// The user-input surface decides how to render a tone; [`Tone::color_name`]
/// gives the conventional colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Success,
    Notice,
    Caution,
    Alarm,
}

impl Tone {
    pub fn color_name(self) -> &'static str {
        match self {
            Tone::Neutral => "black",
            Tone::Success => "green",
            Tone::Notice => "blue",
            Tone::Caution => "orange",
            Tone::Alarm => "red",
        }
    }
}

/// Accept/reject answer returned to the user-input surface for every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub accepted: bool,
    pub message: String,
    pub tone: Tone,
}

impl Feedback {
    pub fn accepted(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            accepted: true,
            message: message.into(),
            tone,
        }
    }

    pub fn rejected(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            accepted: false,
            message: message.into(),
            tone,
        }
    }
}

impl From<&ArmError> for Feedback {
    fn from(err: &ArmError) -> Self {
        Feedback::rejected(err.to_string(), err.tone())
    }
}

impl From<ArmError> for Feedback {
    fn from(err: ArmError) -> Self {
        Feedback::from(&err)
    }
}

/// Global error type for the control stack.
///
/// None of these are fatal: every rejection is returned to the caller and the
/// process keeps running.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmError {
    /// The action is not allowed in the current [`SystemState`].
    #[error("{action} not permitted while {state}")]
    NotPermitted { action: String, state: SystemState },

    /// The requested state-machine event has no transition from `from`.
    #[error("invalid transition: {event} from {from}")]
    InvalidTransition { event: String, from: SystemState },

    /// Writing a position record failed. Recovered locally.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// A motor exceeded the temperature threshold.
    #[error("motor {motor} over temperature: {celsius:.1} °C > {threshold_c:.1} °C")]
    OverTemperature {
        motor: usize,
        celsius: f64,
        threshold_c: f64,
    },

    /// Joint index outside `0..JOINT_COUNT`.
    #[error("joint index {0} out of range (0..{JOINT_COUNT})")]
    InvalidJoint(usize),

    /// A sensor is misconfigured or cannot produce a reading.
    #[error("hardware fault: {0}")]
    HardwareFault(String),

    /// The controller's event queue is gone.
    #[error("channel error: {0}")]
    Channel(String),
}

impl ArmError {
    /// Tone used when this error is shown to the operator.
    pub fn tone(&self) -> Tone {
        match self {
            ArmError::NotPermitted { .. } | ArmError::InvalidJoint(_) => Tone::Caution,
            ArmError::InvalidTransition { .. } => Tone::Caution,
            ArmError::PersistenceFailure(_)
            | ArmError::OverTemperature { .. }
            | ArmError::HardwareFault(_)
            | ArmError::Channel(_) => Tone::Alarm,
        }
    }
}
