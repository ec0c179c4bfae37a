//! [`Controller`] – the foreground event loop that owns the [`Supervisor`].
//!
//! Every mutation of the state machine and the joint model happens on the
//! controller task, in the order events arrive on its queue:
//!
//! ```text
//!  REPL / Ctrl-C ──dispatch──┐
//!                            ├──► mpsc<ControlEvent> ──► Controller ──► Supervisor
//!  TelemetrySampler ─submit──┘                              │
//!                                                           ├──► watch<ArmSnapshot>   (sampler, status)
//!                                                           ├──► watch<TelemetryFrame> (monitor)
//!                                                           └──► EventBus topics       (observers)
//! ```
//!
//! The sampler never touches the supervisor; it reads the published
//! [`ArmSnapshot`] and posts frames back through the same queue, so an
//! over-temperature stop and a user command can never interleave inside one
//! transition.

use std::sync::Arc;

use armctl_kernel::{AuditSink, Supervisor};
use armctl_memory::PositionLog;
use armctl_middleware::{EventBus, Topic};
use armctl_types::{
    ArmError, AuditRecord, Event, EventPayload, Feedback, JointModel, MovementStyle, SystemState,
    TelemetryFrame,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

const SOURCE: &str = "armctl-runtime::controller";

/// Default depth of the controller queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Discrete requests from the user-input surface.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SetJoint { index: usize, angle: f64 },
    ToggleGripper,
    PowerOn,
    PowerOff,
    StartRun,
    PauseResume,
    Home,
    Reset,
    EmergencyStop(String),
    ClearFault,
    SavePosition,
    SetStyle(MovementStyle),
}

impl UserCommand {
    fn name(&self) -> &'static str {
        match self {
            UserCommand::SetJoint { .. } => "set_joint",
            UserCommand::ToggleGripper => "toggle_gripper",
            UserCommand::PowerOn => "power_on",
            UserCommand::PowerOff => "power_off",
            UserCommand::StartRun => "start_run",
            UserCommand::PauseResume => "pause_resume",
            UserCommand::Home => "home",
            UserCommand::Reset => "reset",
            UserCommand::EmergencyStop(_) => "emergency_stop",
            UserCommand::ClearFault => "clear_fault",
            UserCommand::SavePosition => "save_position",
            UserCommand::SetStyle(_) => "set_style",
        }
    }
}

/// Everything the controller queue carries.
#[derive(Debug)]
pub enum ControlEvent {
    Command {
        command: UserCommand,
        reply: oneshot::Sender<Result<Feedback, ArmError>>,
    },
    Telemetry(TelemetryFrame),
}

/// Consistent point-in-time view of the supervisor, published after every
/// event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSnapshot {
    pub state: SystemState,
    pub joints: JointModel,
    pub movement_style: MovementStyle,
}

impl ArmSnapshot {
    fn of(supervisor: &Supervisor) -> Self {
        Self {
            state: supervisor.state(),
            joints: *supervisor.joints(),
            movement_style: supervisor.movement_style(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus audit sink
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards supervisor audit records onto [`Topic::Audit`].
pub struct BusAuditSink {
    bus: EventBus,
}

impl BusAuditSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl AuditSink for BusAuditSink {
    fn record(&self, record: &AuditRecord) {
        self.bus.publish_to(
            Topic::Audit,
            Event::new("armctl-kernel::supervisor", EventPayload::Audit(record.clone())),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

pub struct Controller {
    supervisor: Supervisor,
    positions: PositionLog,
    bus: EventBus,
    events: mpsc::Receiver<ControlEvent>,
    snapshot_tx: watch::Sender<ArmSnapshot>,
    telemetry_tx: watch::Sender<Option<TelemetryFrame>>,
}

impl Controller {
    /// Wire a controller around `supervisor` and return it with the first
    /// handle. Audit records are mirrored onto the bus.
    pub fn new(
        mut supervisor: Supervisor,
        positions: PositionLog,
        bus: EventBus,
        queue_depth: usize,
    ) -> (Self, ControllerHandle) {
        supervisor.add_sink(Arc::new(BusAuditSink::new(bus.clone())));

        let (events_tx, events) = mpsc::channel(queue_depth.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(ArmSnapshot::of(&supervisor));
        let (telemetry_tx, telemetry_rx) = watch::channel(None);

        let handle = ControllerHandle {
            events: events_tx,
            snapshot: snapshot_rx,
            telemetry: telemetry_rx,
        };
        let controller = Self {
            supervisor,
            positions,
            bus,
            events,
            snapshot_tx,
            telemetry_tx,
        };
        (controller, handle)
    }

    /// Drain the queue until every handle is dropped, then hand the
    /// supervisor back.
    pub async fn run(mut self) -> Supervisor {
        info!("controller started");
        self.publish_render();
        while let Some(event) = self.events.recv().await {
            match event {
                ControlEvent::Command { command, reply } => {
                    let result = self.handle_command(command);
                    if reply.send(result).is_err() {
                        debug!("command caller went away before the reply");
                    }
                }
                ControlEvent::Telemetry(frame) => self.handle_telemetry(frame),
            }
        }
        info!("controller queue closed");
        self.supervisor
    }

    #[instrument(skip_all, fields(command = command.name()))]
    fn handle_command(&mut self, command: UserCommand) -> Result<Feedback, ArmError> {
        let before = ArmSnapshot::of(&self.supervisor);
        let stop_reason = match &command {
            UserCommand::EmergencyStop(reason) => Some(reason.clone()),
            _ => None,
        };

        let result = match command {
            UserCommand::SetJoint { index, angle } => {
                self.supervisor.request_joint_move(index, angle)
            }
            UserCommand::ToggleGripper => self.supervisor.toggle_gripper(),
            UserCommand::PowerOn => self.supervisor.power_on(),
            UserCommand::PowerOff => self.supervisor.power_off(),
            UserCommand::StartRun => self.supervisor.start_run(),
            UserCommand::PauseResume => self.supervisor.pause_resume(),
            UserCommand::Home => self.supervisor.home(),
            UserCommand::Reset => self.supervisor.reset(),
            UserCommand::EmergencyStop(reason) => self.supervisor.emergency_stop(&reason),
            UserCommand::ClearFault => self.supervisor.clear_fault(),
            UserCommand::SavePosition => {
                let positions = &self.positions;
                self.supervisor
                    .save_position(|record| positions.append(record).map_err(ArmError::from))
            }
            UserCommand::SetStyle(style) => Ok(self.supervisor.set_movement_style(style)),
        };

        if let Err(err) = &result {
            warn!(%err, "command rejected");
        }
        self.after_event(before, stop_reason);
        result
    }

    fn handle_telemetry(&mut self, frame: TelemetryFrame) {
        let before = ArmSnapshot::of(&self.supervisor);
        let stopped = self.supervisor.ingest_telemetry(&frame).is_some();

        self.telemetry_tx.send_replace(Some(frame.clone()));
        self.bus.publish_to(
            Topic::Telemetry,
            Event::new("armctl-runtime::sampler", EventPayload::Telemetry(frame)),
        );
        self.after_event(before, stopped.then(|| "Overheat".to_string()));
    }

    /// Publish what changed: snapshot, alerts and the render view.
    fn after_event(&mut self, before: ArmSnapshot, stop_reason: Option<String>) {
        let after = ArmSnapshot::of(&self.supervisor);
        if after == before {
            return;
        }
        self.snapshot_tx.send_replace(after);

        if after.state != before.state {
            self.bus.publish_to(
                Topic::SystemAlerts,
                Event::new(
                    SOURCE,
                    EventPayload::StateChanged {
                        from: before.state,
                        to: after.state,
                    },
                ),
            );
            if after.state == SystemState::Emergency
                && let Some(reason) = stop_reason
            {
                self.bus.publish_to(
                    Topic::SystemAlerts,
                    Event::new(SOURCE, EventPayload::EmergencyStop { reason }),
                );
            }
        }
        self.publish_render();
    }

    fn publish_render(&self) {
        self.bus.publish_to(
            Topic::Render,
            Event::new(SOURCE, EventPayload::Render(self.supervisor.render_snapshot())),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cheap, cloneable way in to a running [`Controller`].
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    events: mpsc::Sender<ControlEvent>,
    snapshot: watch::Receiver<ArmSnapshot>,
    telemetry: watch::Receiver<Option<TelemetryFrame>>,
}

impl ControllerHandle {
    /// Deliver `command` and wait for the supervisor's answer.
    ///
    /// # Errors
    ///
    /// The supervisor's rejection, or [`ArmError::Channel`] when the
    /// controller is gone.
    pub async fn dispatch(&self, command: UserCommand) -> Result<Feedback, ArmError> {
        let (reply, answer) = oneshot::channel();
        self.events
            .send(ControlEvent::Command { command, reply })
            .await
            .map_err(|_| closed())?;
        answer.await.map_err(|_| closed())?
    }

    /// [`dispatch`](Self::dispatch) for plain threads (REPL, signal handler).
    /// Must not be called from inside the Tokio runtime.
    pub fn blocking_dispatch(&self, command: UserCommand) -> Result<Feedback, ArmError> {
        let (reply, answer) = oneshot::channel();
        self.events
            .blocking_send(ControlEvent::Command { command, reply })
            .map_err(|_| closed())?;
        answer.blocking_recv().map_err(|_| closed())?
    }

    /// Post a telemetry frame. Does not wait for evaluation.
    pub async fn submit_telemetry(&self, frame: TelemetryFrame) -> Result<(), ArmError> {
        self.events
            .send(ControlEvent::Telemetry(frame))
            .await
            .map_err(|_| closed())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> ArmSnapshot {
        *self.snapshot.borrow()
    }

    /// Last telemetry frame the controller evaluated, if any. Stays put while
    /// the sampler is idle.
    pub fn latest_telemetry(&self) -> Option<TelemetryFrame> {
        self.telemetry.borrow().clone()
    }

    /// Wait until the snapshot changes. `false` once the controller is gone.
    pub async fn changed(&mut self) -> bool {
        self.snapshot.changed().await.is_ok()
    }

    /// `true` once the controller task has stopped taking events.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

fn closed() -> ArmError {
    ArmError::Channel("controller is not running".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armctl_types::{AuditLevel, JOINT_COUNT, Tone};

    fn spawn_controller(
        dir: &tempfile::TempDir,
    ) -> (ControllerHandle, EventBus, tokio::task::JoinHandle<Supervisor>) {
        let bus = EventBus::default();
        let log = PositionLog::new(dir.path().join("positions.json"));
        let (controller, handle) =
            Controller::new(Supervisor::default(), log, bus.clone(), DEFAULT_QUEUE_DEPTH);
        let task = tokio::spawn(controller.run());
        (handle, bus, task)
    }

    fn frame(seq: u64, temps: [f64; JOINT_COUNT]) -> TelemetryFrame {
        TelemetryFrame::from_model(seq, &JointModel::new(), temps)
    }

    #[tokio::test]
    async fn commands_update_the_snapshot() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, _bus, _task) = spawn_controller(&dir);

        assert_eq!(handle.snapshot().state, SystemState::Off);
        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle
            .dispatch(UserCommand::SetJoint { index: 2, angle: 44.6 })
            .await
            .unwrap();

        let snap = handle.snapshot();
        assert_eq!(snap.state, SystemState::Ready);
        assert_eq!(snap.joints.angle(2), Some(45));
    }

    #[tokio::test]
    async fn rejection_comes_back_as_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, _bus, _task) = spawn_controller(&dir);

        let err = handle.dispatch(UserCommand::ToggleGripper).await.unwrap_err();
        assert!(matches!(err, ArmError::NotPermitted { .. }));
        assert_eq!(Feedback::from(err).tone, Tone::Caution);
        assert!(!handle.snapshot().joints.gripper_closed());
    }

    #[tokio::test]
    async fn save_appends_to_position_log() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, _bus, _task) = spawn_controller(&dir);

        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle
            .dispatch(UserCommand::SetJoint { index: 0, angle: 90.0 })
            .await
            .unwrap();
        handle.dispatch(UserCommand::SavePosition).await.unwrap();

        let records = PositionLog::new(dir.path().join("positions.json"))
            .read_all()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].joints, [90, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn save_failure_is_reported_and_controller_survives() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let bus = EventBus::default();
        // The directory itself is not appendable.
        let log = PositionLog::new(dir.path());
        let (controller, handle) =
            Controller::new(Supervisor::default(), log, bus, DEFAULT_QUEUE_DEPTH);
        let _task = tokio::spawn(controller.run());

        let err = handle.dispatch(UserCommand::SavePosition).await.unwrap_err();
        assert!(matches!(err, ArmError::PersistenceFailure(_)));
        assert!(handle.dispatch(UserCommand::PowerOn).await.is_ok());
    }

    #[tokio::test]
    async fn state_changes_and_audit_reach_the_bus() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, bus, _task) = spawn_controller(&dir);
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let mut audit = bus.subscribe_to(Topic::Audit);

        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle
            .dispatch(UserCommand::EmergencyStop("button".into()))
            .await
            .unwrap();

        let alerts = alerts.drain();
        assert!(matches!(
            alerts[0].payload,
            EventPayload::StateChanged { from: SystemState::Off, to: SystemState::Ready }
        ));
        assert!(matches!(
            &alerts[2].payload,
            EventPayload::EmergencyStop { reason } if reason == "button"
        ));

        let critical = audit
            .drain()
            .into_iter()
            .filter(|e| matches!(&e.payload, EventPayload::Audit(r) if r.level == AuditLevel::Critical))
            .count();
        assert_eq!(critical, 1);
    }

    #[tokio::test]
    async fn hot_frame_forces_emergency_once() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, bus, _task) = spawn_controller(&dir);
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);

        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle.dispatch(UserCommand::StartRun).await.unwrap();
        let hot = [30.0, 30.0, 70.0, 30.0, 30.0, 30.0];
        for seq in 1..=3 {
            handle.submit_telemetry(frame(seq, hot)).await.unwrap();
        }
        // A command round-trip guarantees the frames ahead of it were handled.
        handle
            .dispatch(UserCommand::SetStyle(MovementStyle::Precise))
            .await
            .unwrap();

        assert_eq!(handle.snapshot().state, SystemState::Emergency);
        assert_eq!(handle.latest_telemetry().map(|f| f.sequence), Some(3));
        let stops = alerts
            .drain()
            .into_iter()
            .filter(|e| matches!(&e.payload, EventPayload::EmergencyStop { reason } if reason == "Overheat"))
            .count();
        assert_eq!(stops, 1);
    }

    #[tokio::test]
    async fn run_returns_supervisor_when_handles_drop() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, _bus, task) = spawn_controller(&dir);
        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        drop(handle);

        let supervisor = task.await.unwrap();
        assert_eq!(supervisor.state(), SystemState::Ready);
    }

    #[tokio::test]
    async fn handle_reports_closed_after_controller_stops() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let (handle, _bus, task) = spawn_controller(&dir);
        assert!(!handle.is_closed());

        task.abort();
        let _ = task.await;

        assert!(handle.is_closed());
        let err = handle.dispatch(UserCommand::PowerOn).await.unwrap_err();
        assert!(matches!(err, ArmError::Channel(_)));
    }

    #[test]
    fn blocking_dispatch_from_plain_thread() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().expect("tmp dir");
        let bus = EventBus::default();
        let log = PositionLog::new(dir.path().join("positions.json"));
        let (controller, handle) =
            Controller::new(Supervisor::default(), log, bus, DEFAULT_QUEUE_DEPTH);
        rt.spawn(controller.run());

        let fb = std::thread::spawn(move || handle.blocking_dispatch(UserCommand::PowerOn))
            .join()
            .unwrap()
            .unwrap();
        assert!(fb.accepted);
    }
}
