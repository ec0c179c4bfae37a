//! End-to-end runs through the controller and the sampler.

use std::time::Duration;

use armctl_hal::ScriptedSensor;
use armctl_kernel::Supervisor;
use armctl_memory::PositionLog;
use armctl_middleware::{EventBus, Topic};
use armctl_runtime::{
    Controller, ControllerHandle, DEFAULT_QUEUE_DEPTH, TelemetrySampler, UserCommand,
};
use armctl_types::{ArmError, AuditLevel, EventPayload, JOINT_COUNT, RenderSnapshot, SystemState};
use tokio::task::JoinHandle;

struct Rig {
    handle: ControllerHandle,
    bus: EventBus,
    controller: JoinHandle<Supervisor>,
    _dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().expect("tmp dir");
    let bus = EventBus::default();
    let log = PositionLog::new(dir.path().join("positions.json"));
    let (controller, handle) =
        Controller::new(Supervisor::default(), log, bus.clone(), DEFAULT_QUEUE_DEPTH);
    Rig {
        handle,
        bus,
        controller: tokio::spawn(controller.run()),
        _dir: dir,
    }
}

fn last_render(events: Vec<armctl_types::Event>) -> Option<RenderSnapshot> {
    events.into_iter().rev().find_map(|e| match e.payload {
        EventPayload::Render(snapshot) => Some(snapshot),
        _ => None,
    })
}

#[tokio::test]
async fn power_on_move_and_emergency_stop() {
    let rig = rig();
    let mut render = rig.bus.subscribe_to(Topic::Render);

    rig.handle.dispatch(UserCommand::PowerOn).await.unwrap();
    assert_eq!(rig.handle.snapshot().state, SystemState::Ready);
    let straight = last_render(render.drain()).expect("render after power on");
    assert!((straight.end_effector.x - 630.0).abs() < 1e-9);

    rig.handle
        .dispatch(UserCommand::SetJoint { index: 0, angle: 90.0 })
        .await
        .unwrap();
    assert_eq!(rig.handle.snapshot().joints.angle(0), Some(90));
    let raised = last_render(render.drain()).expect("render after joint move");
    // Every segment now points straight up the screen.
    assert!((raised.end_effector.x - 300.0).abs() < 1e-9);
    assert!((raised.end_effector.y - 20.0).abs() < 1e-9);

    rig.handle
        .dispatch(UserCommand::EmergencyStop("test".into()))
        .await
        .unwrap();
    assert_eq!(rig.handle.snapshot().state, SystemState::Emergency);

    let rejected = rig
        .handle
        .dispatch(UserCommand::SetJoint { index: 1, angle: 45.0 })
        .await;
    assert!(matches!(rejected, Err(ArmError::NotPermitted { .. })));
    assert_eq!(rig.handle.snapshot().joints.angle(1), Some(0));

    let power_off = rig.handle.dispatch(UserCommand::PowerOff).await;
    assert!(matches!(power_off, Err(ArmError::InvalidTransition { .. })));
    assert_eq!(rig.handle.snapshot().state, SystemState::Emergency);
}

#[tokio::test]
async fn overheat_episode_stops_once_and_clears() {
    let rig = rig();
    let mut audit = rig.bus.subscribe_to(Topic::Audit);
    let mut alerts = rig.bus.subscribe_to(Topic::SystemAlerts);

    rig.handle.dispatch(UserCommand::PowerOn).await.unwrap();
    rig.handle.dispatch(UserCommand::StartRun).await.unwrap();

    let hot = [30.0, 30.0, 30.0, 64.5, 30.0, 30.0];
    let sensor = ScriptedSensor::new([30.0; JOINT_COUNT])
        .then(hot)
        .then(hot)
        .then(hot);
    let sampler =
        TelemetrySampler::new(sensor, rig.handle.clone(), Duration::from_millis(5)).spawn();

    let mut watcher = rig.handle.clone();
    tokio::time::timeout(Duration::from_secs(2), async {
        while watcher.snapshot().state != SystemState::Emergency {
            if !watcher.changed().await {
                break;
            }
        }
    })
    .await
    .expect("emergency within the timeout");
    sampler.stop().await;

    rig.handle.dispatch(UserCommand::ClearFault).await.unwrap();
    let snap = rig.handle.snapshot();
    assert_eq!(snap.state, SystemState::Off);
    assert!(snap.joints.is_home());

    let critical: Vec<String> = audit
        .drain()
        .into_iter()
        .filter_map(|e| match e.payload {
            EventPayload::Audit(r) if r.level == AuditLevel::Critical => Some(r.message),
            _ => None,
        })
        .collect();
    assert_eq!(critical, ["EMERGENCY STOP! Reason: Overheat"]);

    let stops = alerts
        .drain()
        .into_iter()
        .filter(|e| matches!(e.payload, EventPayload::EmergencyStop { .. }))
        .count();
    assert_eq!(stops, 1);
}

#[tokio::test]
async fn saved_positions_survive_the_controller() {
    let rig = rig();
    let path = rig._dir.path().join("positions.json");

    rig.handle.dispatch(UserCommand::PowerOn).await.unwrap();
    rig.handle
        .dispatch(UserCommand::SetJoint { index: 5, angle: 179.6 })
        .await
        .unwrap();
    rig.handle.dispatch(UserCommand::ToggleGripper).await.unwrap();
    rig.handle.dispatch(UserCommand::SavePosition).await.unwrap();
    rig.handle.dispatch(UserCommand::PowerOff).await.unwrap();
    rig.handle.dispatch(UserCommand::SavePosition).await.unwrap();

    let Rig { handle, controller, _dir, .. } = rig;
    drop(handle);
    let supervisor = controller.await.unwrap();
    assert_eq!(supervisor.state(), SystemState::Off);

    let records = PositionLog::new(&path).read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].joints, [0, 0, 0, 0, 0, 180]);
    assert!(records[0].gripper);
    assert_eq!(records[1].joints, [0; JOINT_COUNT]);
    assert!(!records[1].gripper);
}
