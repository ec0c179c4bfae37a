//! `armctl-kernel` – Safety & Supervision
//!
//! The part of the stack that decides what the arm may do. It does not draw
//! and it does not talk to hardware; it enforces rules and owns the state.
//!
//! # Modules
//!
//! - [`safety_interlock`] – [`SafetyInterlock`][safety_interlock::SafetyInterlock]:
//!   the single authority on whether an action is permitted in the current
//!   [`SystemState`][armctl_types::SystemState], and the rule engine that
//!   turns telemetry breaches into emergency stops.
//! - [`supervisor`] – [`Supervisor`][supervisor::Supervisor]:
//!   the supervisory state machine (off/ready/running/paused/emergency). It
//!   owns the [`JointModel`][armctl_types::JointModel], recomputes the pose on
//!   every change and emits audit records.
//! - [`audit`] – [`AuditSink`][audit::AuditSink]: the observer interface the
//!   supervisor reports structured log records to.

pub mod audit;
pub mod safety_interlock;
pub mod supervisor;

pub use audit::{AuditSink, MemorySink};
pub use safety_interlock::{
    Action, OverTemperatureRule, SafetyInterlock, TelemetryRule, Verdict, is_motion_allowed,
};
pub use supervisor::Supervisor;
