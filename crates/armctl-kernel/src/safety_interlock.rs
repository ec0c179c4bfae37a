//! [`SafetyInterlock`] – permission checks and telemetry rule engine.
//!
//! Two jobs, one authority:
//!
//! 1. **Permission** ([`SafetyInterlock::permit`]): every motion, gripper and
//!    power-down request is checked against the current [`SystemState`].
//!    All motion gating funnels through [`is_motion_allowed`].
//! 2. **Telemetry** ([`SafetyInterlock::evaluate`]): each incoming
//!    [`TelemetryFrame`] is run through the registered [`TelemetryRule`]s.
//!    The first violation opens a *breach episode* and is reported once as
//!    [`Verdict::Breach`]; further violating frames report
//!    [`Verdict::Ongoing`] until a clean frame closes the episode.
//!
//! # Example
//!
//! ```
//! use armctl_kernel::safety_interlock::{Action, SafetyInterlock, Verdict};
//! use armctl_types::{JointModel, SystemState, TelemetryFrame};
//!
//! let mut interlock = SafetyInterlock::with_overheat_threshold(60.0);
//! assert!(interlock.permit(SystemState::Ready, Action::JointMove).is_ok());
//! assert!(interlock.permit(SystemState::Off, Action::JointMove).is_err());
//!
//! let hot = TelemetryFrame::from_model(1, &JointModel::new(), [30.0, 30.0, 75.0, 30.0, 30.0, 30.0]);
//! assert!(matches!(interlock.evaluate(&hot), Verdict::Breach(_)));
//! assert!(matches!(interlock.evaluate(&hot), Verdict::Ongoing));
//! ```

use armctl_types::{ArmError, SystemState, TelemetryFrame};
use tracing::warn;

/// Default over-temperature threshold in °C.
pub const DEFAULT_OVERHEAT_THRESHOLD_C: f64 = 60.0;

/// `true` in the states where the arm may be moved.
///
/// The single predicate behind joint moves, gripper toggles, homing and
/// reset.
pub fn is_motion_allowed(state: SystemState) -> bool {
    matches!(
        state,
        SystemState::Ready | SystemState::Running | SystemState::Paused
    )
}

/// Requests that need the interlock's permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    JointMove,
    GripperToggle,
    Home,
    Reset,
    PowerOff,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::JointMove => "joint move",
            Action::GripperToggle => "gripper toggle",
            Action::Home => "home",
            Action::Reset => "reset",
            Action::PowerOff => "power_off",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Telemetry rules
// ────────────────────────────────────────────────────────────────────────────

/// A single invariant every telemetry frame must satisfy.
pub trait TelemetryRule: Send + Sync {
    /// Human-readable name used in log messages.
    fn name(&self) -> &str;

    /// `Ok(())` when the frame is within limits.
    fn check(&self, frame: &TelemetryFrame) -> Result<(), ArmError>;
}

/// Trips when any motor is strictly hotter than `threshold_c`.
pub struct OverTemperatureRule {
    pub threshold_c: f64,
}

impl TelemetryRule for OverTemperatureRule {
    fn name(&self) -> &str {
        "over_temperature"
    }

    fn check(&self, frame: &TelemetryFrame) -> Result<(), ArmError> {
        let hottest = frame.hottest();
        if hottest.temperature_c > self.threshold_c {
            return Err(ArmError::OverTemperature {
                motor: hottest.motor,
                celsius: hottest.temperature_c,
                threshold_c: self.threshold_c,
            });
        }
        Ok(())
    }
}

/// Outcome of [`SafetyInterlock::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Every rule passed.
    Nominal,
    /// First violating frame of a new episode; the caller must stop the arm.
    Breach(ArmError),
    /// Still violating, already reported.
    Ongoing,
}

// ────────────────────────────────────────────────────────────────────────────
// SafetyInterlock
// ────────────────────────────────────────────────────────────────────────────

/// Permission gate plus telemetry rule engine.
#[derive(Default)]
pub struct SafetyInterlock {
    rules: Vec<Box<dyn TelemetryRule>>,
    breach_active: bool,
}

impl SafetyInterlock {
    /// An interlock with no telemetry rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// An interlock with a single [`OverTemperatureRule`].
    pub fn with_overheat_threshold(threshold_c: f64) -> Self {
        let mut interlock = Self::new();
        interlock.add_rule(Box::new(OverTemperatureRule { threshold_c }));
        interlock
    }

    /// Register a telemetry rule. Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn TelemetryRule>) {
        self.rules.push(rule);
    }

    /// Decide whether `action` may run in `state`.
    ///
    /// # Errors
    ///
    /// - [`ArmError::NotPermitted`] – motion or gripper request outside
    ///   ready/running/paused.
    /// - [`ArmError::InvalidTransition`] – power-down while off or while in
    ///   emergency.
    pub fn permit(&self, state: SystemState, action: Action) -> Result<(), ArmError> {
        match action {
            Action::JointMove | Action::GripperToggle | Action::Home | Action::Reset => {
                if is_motion_allowed(state) {
                    Ok(())
                } else {
                    Err(ArmError::NotPermitted {
                        action: action.name().to_string(),
                        state,
                    })
                }
            }
            Action::PowerOff => {
                if is_motion_allowed(state) {
                    Ok(())
                } else {
                    Err(ArmError::InvalidTransition {
                        event: action.name().to_string(),
                        from: state,
                    })
                }
            }
        }
    }

    /// Run `frame` through every rule and track the breach episode.
    pub fn evaluate(&mut self, frame: &TelemetryFrame) -> Verdict {
        let violation = self.rules.iter().find_map(|rule| match rule.check(frame) {
            Ok(()) => None,
            Err(err) => {
                warn!(rule = rule.name(), sequence = frame.sequence, %err, "telemetry rule violated");
                Some(err)
            }
        });

        match violation {
            None => {
                self.breach_active = false;
                Verdict::Nominal
            }
            Some(_) if self.breach_active => Verdict::Ongoing,
            Some(err) => {
                self.breach_active = true;
                Verdict::Breach(err)
            }
        }
    }

    /// `true` while a breach episode is open.
    pub fn breach_active(&self) -> bool {
        self.breach_active
    }

    /// Close any open episode so the next violation is reported again.
    pub fn reset_episode(&mut self) {
        self.breach_active = false;
    }
}
