//! `armctl-runtime` – the arm controller's execution engine.
//!
//! Puts the kernel on a Tokio runtime: one foreground task that owns the
//! [`Supervisor`][armctl_kernel::Supervisor] and one periodic background
//! task that samples motor temperatures. They talk only through messages.
//!
//! # Modules
//!
//! - [`controller`] – [`Controller`][controller::Controller]: drains the
//!   event queue, applies commands and telemetry frames to the supervisor,
//!   and publishes snapshots plus bus events.
//!   [`ControllerHandle`][controller::ControllerHandle] is the cloneable way
//!   in, with async and blocking `dispatch`.
//! - [`sampler`] – [`TelemetrySampler`][sampler::TelemetrySampler]: builds
//!   one telemetry frame per tick while motion is allowed, with an explicit
//!   stop signal.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional JSON output and OTLP export.
//!
//! # Example
//!
//! ```rust
//! use armctl_kernel::Supervisor;
//! use armctl_memory::PositionLog;
//! use armctl_middleware::EventBus;
//! use armctl_runtime::{Controller, UserCommand, DEFAULT_QUEUE_DEPTH};
//! use armctl_types::SystemState;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let log = PositionLog::new(std::env::temp_dir().join("armctl-doc-positions.json"));
//! let (controller, handle) =
//!     Controller::new(Supervisor::default(), log, EventBus::default(), DEFAULT_QUEUE_DEPTH);
//! tokio::spawn(controller.run());
//!
//! handle.dispatch(UserCommand::PowerOn).await.unwrap();
//! assert_eq!(handle.snapshot().state, SystemState::Ready);
//! # }
//! ```

pub mod controller;
pub mod sampler;
pub mod telemetry;

pub use controller::{
    ArmSnapshot, BusAuditSink, ControlEvent, Controller, ControllerHandle, DEFAULT_QUEUE_DEPTH,
    UserCommand,
};
pub use sampler::{SamplerTask, TelemetrySampler};
pub use telemetry::{TracerProviderGuard, init_tracing};
