//! [`Supervisor`] – the supervisory state machine.
//!
//! | From | Event | To |
//! |---|---|---|
//! | off | `power_on` | ready |
//! | ready / running / paused | `power_off` | off (after homing) |
//! | ready | `start_run` | running |
//! | running | `pause` | paused |
//! | paused | `resume` | running |
//! | ready / running / paused | `emergency_stop` | emergency |
//! | emergency | `clear_fault` | off (after homing) |
//!
//! Anything else is an [`ArmError::InvalidTransition`]. Motion requests
//! (`request_joint_move`, `toggle_gripper`, `home`, `reset`) are gated by the
//! [`SafetyInterlock`] and rejected with [`ArmError::NotPermitted`] outside
//! ready/running/paused, leaving the joint model untouched.
//!
//! `emergency_stop` is idempotent: from emergency it does nothing and emits
//! no record, so user and telemetry paths can both call it freely.
//!
//! # Example
//!
//! ```
//! use armctl_kernel::Supervisor;
//! use armctl_types::SystemState;
//!
//! let mut sup = Supervisor::default();
//! sup.power_on().unwrap();
//! sup.request_joint_move(0, 90.0).unwrap();
//! assert_eq!(sup.joints().angle(0), Some(90));
//!
//! sup.emergency_stop("test").unwrap();
//! assert!(sup.request_joint_move(1, 45.0).is_err());
//! assert_eq!(sup.state(), SystemState::Emergency);
//! ```

use std::sync::Arc;

use armctl_kinematics::{ChainConfig, forward_kinematics};
use armctl_types::{
    ArmError, AuditLevel, AuditRecord, Feedback, JointModel, MovementStyle, PositionRecord, Pose,
    RenderSnapshot, SystemState, TelemetryFrame, Tone,
};
use tracing::{debug, error, info, warn};

use crate::audit::AuditSink;
use crate::safety_interlock::{
    Action, DEFAULT_OVERHEAT_THRESHOLD_C, SafetyInterlock, Verdict,
};

/// Owns the system state and the joint model. All mutation goes through it.
pub struct Supervisor {
    state: SystemState,
    joints: JointModel,
    style: MovementStyle,
    chain: ChainConfig,
    pose: Pose,
    interlock: SafetyInterlock,
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(
            ChainConfig::default(),
            SafetyInterlock::with_overheat_threshold(DEFAULT_OVERHEAT_THRESHOLD_C),
        )
    }
}

impl Supervisor {
    /// Start in [`SystemState::Off`] with the arm at home.
    pub fn new(chain: ChainConfig, interlock: SafetyInterlock) -> Self {
        let joints = JointModel::new();
        Self {
            state: SystemState::Off,
            joints,
            style: MovementStyle::default(),
            pose: forward_kinematics(&joints.angles(), joints.gripper_closed(), &chain),
            chain,
            interlock,
            sinks: Vec::new(),
        }
    }

    /// Register an observer for audit records.
    pub fn add_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    // ------------------------------------------------------------------ queries

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn joints(&self) -> &JointModel {
        &self.joints
    }

    pub fn movement_style(&self) -> MovementStyle {
        self.style
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Plain-data view for the render surface.
    pub fn render_snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            joint_positions: self.pose.joint_positions,
            end_effector: self.pose.end_effector,
            jaw_tips: self.pose.jaw_tips,
            gripper_closed: self.joints.gripper_closed(),
            system_state: self.state,
            joint_angles: self.joints.angles(),
            movement_style: self.style,
        }
    }

    /// Record of the current joint model, stamped now.
    pub fn position_record(&self) -> PositionRecord {
        PositionRecord::capture(&self.joints)
    }

    // ------------------------------------------------------------------ power

    pub fn power_on(&mut self) -> Result<Feedback, ArmError> {
        self.expect_state("power_on", &[SystemState::Off])?;
        self.transition(SystemState::Ready, AuditLevel::Info, "System powered on and ready");
        Ok(Feedback::accepted(SystemState::Ready.label(), Tone::Success))
    }

    /// Home the arm, then power down. Refused in emergency.
    pub fn power_off(&mut self) -> Result<Feedback, ArmError> {
        self.interlock
            .permit(self.state, Action::PowerOff)
            .inspect_err(|err| warn!(%err, "power_off refused"))?;
        self.drive_home();
        self.transition(SystemState::Off, AuditLevel::Info, "System powered off");
        Ok(Feedback::accepted(SystemState::Off.label(), Tone::Alarm))
    }

    // ------------------------------------------------------------------ run control

    pub fn start_run(&mut self) -> Result<Feedback, ArmError> {
        self.expect_state("start_run", &[SystemState::Ready])?;
        self.transition(SystemState::Running, AuditLevel::Info, "Run started");
        Ok(Feedback::accepted(SystemState::Running.label(), Tone::Success))
    }

    pub fn pause(&mut self) -> Result<Feedback, ArmError> {
        self.expect_state("pause", &[SystemState::Running])?;
        self.transition(SystemState::Paused, AuditLevel::Info, "Operation paused");
        Ok(Feedback::accepted(SystemState::Paused.label(), Tone::Caution))
    }

    pub fn resume(&mut self) -> Result<Feedback, ArmError> {
        self.expect_state("resume", &[SystemState::Paused])?;
        self.transition(SystemState::Running, AuditLevel::Info, "Operation resumed");
        Ok(Feedback::accepted(SystemState::Running.label(), Tone::Success))
    }

    /// Pause when running, resume when paused.
    pub fn pause_resume(&mut self) -> Result<Feedback, ArmError> {
        match self.state {
            SystemState::Running => self.pause(),
            SystemState::Paused => self.resume(),
            from => Err(ArmError::InvalidTransition {
                event: "pause_resume".to_string(),
                from,
            }),
        }
    }

    // ------------------------------------------------------------------ faults

    /// Stop everything and latch [`SystemState::Emergency`].
    ///
    /// No-op (no transition, no record) when already in emergency.
    ///
    /// # Errors
    ///
    /// [`ArmError::InvalidTransition`] from [`SystemState::Off`].
    pub fn emergency_stop(&mut self, reason: &str) -> Result<Feedback, ArmError> {
        match self.state {
            SystemState::Emergency => {
                debug!(reason, "emergency stop already active");
                Ok(Feedback::rejected("Emergency stop already active", Tone::Alarm))
            }
            SystemState::Off => Err(ArmError::InvalidTransition {
                event: "emergency_stop".to_string(),
                from: SystemState::Off,
            }),
            _ => {
                let message = format!("EMERGENCY STOP! Reason: {reason}");
                self.transition(SystemState::Emergency, AuditLevel::Critical, &message);
                Ok(Feedback::accepted(message, Tone::Alarm))
            }
        }
    }

    /// Leave emergency: home the arm and go to [`SystemState::Off`].
    pub fn clear_fault(&mut self) -> Result<Feedback, ArmError> {
        self.expect_state("clear_fault", &[SystemState::Emergency])?;
        self.interlock.reset_episode();
        self.drive_home();
        self.transition(SystemState::Off, AuditLevel::Warning, "Fault cleared, system off");
        Ok(Feedback::accepted("Fault cleared", Tone::Caution))
    }

    /// Feed one telemetry frame to the interlock; an over-temperature breach
    /// triggers `emergency_stop("Overheat")` once per episode.
    ///
    /// Returns the emergency feedback when this frame caused the stop.
    pub fn ingest_telemetry(&mut self, frame: &TelemetryFrame) -> Option<Feedback> {
        // Frames queued before a power-down are stale.
        if self.state == SystemState::Off {
            return None;
        }
        match self.interlock.evaluate(frame) {
            Verdict::Breach(err) => {
                error!(critical = true, sequence = frame.sequence, %err, "over-temperature breach");
                self.emergency_stop("Overheat")
                    .ok()
                    .filter(|feedback| feedback.accepted)
            }
            Verdict::Ongoing | Verdict::Nominal => None,
        }
    }

    // ------------------------------------------------------------------ motion

    /// Move joint `index` to `angle` (rounded and clamped to [0, 180]).
    pub fn request_joint_move(&mut self, index: usize, angle: f64) -> Result<Feedback, ArmError> {
        self.interlock.permit(self.state, Action::JointMove)?;
        let applied = self.joints.set_angle(index, angle)?;
        self.recompute_pose();
        let message = format!("Joint {} set to {applied}°", index + 1);
        self.audit(AuditLevel::Debug, &message);
        Ok(Feedback::accepted(message, Tone::Neutral))
    }

    pub fn toggle_gripper(&mut self) -> Result<Feedback, ArmError> {
        self.interlock.permit(self.state, Action::GripperToggle)?;
        let closed = self.joints.toggle_gripper();
        self.recompute_pose();
        let message = if closed { "Gripper closed" } else { "Gripper opened" };
        self.audit(AuditLevel::Info, message);
        Ok(Feedback::accepted(message, Tone::Neutral))
    }

    /// All joints to 0°, gripper open.
    pub fn home(&mut self) -> Result<Feedback, ArmError> {
        self.interlock.permit(self.state, Action::Home)?;
        self.drive_home();
        Ok(Feedback::accepted("Arm at home position", Tone::Success))
    }

    /// Home plus a warning-level record.
    pub fn reset(&mut self) -> Result<Feedback, ArmError> {
        self.interlock.permit(self.state, Action::Reset)?;
        self.drive_home();
        self.audit(AuditLevel::Warning, "System reset");
        Ok(Feedback::accepted("Robot reset", Tone::Caution))
    }

    /// Capture the joint model and hand it to `persist`. Allowed in every
    /// state. A failed write is logged at error level and returned as
    /// [`ArmError::PersistenceFailure`]; nothing else changes.
    pub fn save_position<F>(&self, persist: F) -> Result<Feedback, ArmError>
    where
        F: FnOnce(&PositionRecord) -> Result<(), ArmError>,
    {
        let record = self.position_record();
        match persist(&record) {
            Ok(()) => {
                self.audit(AuditLevel::Info, "Position saved");
                Ok(Feedback::accepted("Position saved", Tone::Success))
            }
            Err(err) => {
                let err = match err {
                    ArmError::PersistenceFailure(_) => err,
                    other => ArmError::PersistenceFailure(other.to_string()),
                };
                self.audit(AuditLevel::Error, &format!("Failed to save position: {err}"));
                Err(err)
            }
        }
    }

    /// Allowed in every state.
    pub fn set_movement_style(&mut self, style: MovementStyle) -> Feedback {
        self.style = style;
        let message = format!("Movement style changed: {}", style.description());
        self.audit(AuditLevel::Info, &message);
        Feedback::accepted(style.description(), Tone::Notice)
    }

    // ------------------------------------------------------------------ internals

    fn expect_state(&self, event: &str, allowed: &[SystemState]) -> Result<(), ArmError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            warn!(event, from = %self.state, "invalid transition");
            Err(ArmError::InvalidTransition {
                event: event.to_string(),
                from: self.state,
            })
        }
    }

    fn drive_home(&mut self) {
        self.joints.home();
        self.recompute_pose();
        self.audit(AuditLevel::Info, "Arm moved to home position");
    }

    fn recompute_pose(&mut self) {
        self.pose = forward_kinematics(
            &self.joints.angles(),
            self.joints.gripper_closed(),
            &self.chain,
        );
    }

    fn transition(&mut self, to: SystemState, level: AuditLevel, message: &str) {
        let from = self.state;
        self.state = to;
        info!(%from, %to, "state transition");
        self.audit(level, message);
    }

    fn audit(&self, level: AuditLevel, message: &str) {
        match level {
            AuditLevel::Debug => debug!(target: "armctl::audit", "{message}"),
            AuditLevel::Info => info!(target: "armctl::audit", "{message}"),
            AuditLevel::Warning => warn!(target: "armctl::audit", "{message}"),
            AuditLevel::Error => error!(target: "armctl::audit", "{message}"),
            AuditLevel::Critical => error!(target: "armctl::audit", critical = true, "{message}"),
        }
        let record = AuditRecord::new(level, message);
        for sink in &self.sinks {
            sink.record(&record);
        }
    }
}
