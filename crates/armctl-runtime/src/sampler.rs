//! [`TelemetrySampler`] – the periodic background task.
//!
//! Each tick it takes one [`ArmSnapshot`] from the controller. If motion is
//! allowed it reads every motor temperature, builds a [`TelemetryFrame`]
//! from the snapshot's joint angles and posts it to the controller queue.
//! Otherwise the tick is skipped and the monitor keeps the last frame.
//!
//! The task stops when its stop signal flips to `true` (or the sender is
//! dropped) and when the controller queue closes.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(handle: armctl_runtime::ControllerHandle) -> Result<(), armctl_types::ArmError> {
//! use std::time::Duration;
//! use armctl_hal::SimThermalSensor;
//! use armctl_runtime::TelemetrySampler;
//!
//! let sampler = TelemetrySampler::new(
//!     SimThermalSensor::new(25.0, 45.0)?,
//!     handle,
//!     Duration::from_secs(1),
//! );
//! let task = sampler.spawn();
//! // ...
//! let frames = task.stop().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use armctl_hal::TemperatureSensor;
use armctl_kernel::is_motion_allowed;
use armctl_types::TelemetryFrame;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::controller::ControllerHandle;

pub struct TelemetrySampler<S> {
    sensor: S,
    handle: ControllerHandle,
    period: Duration,
    sequence: u64,
}

impl<S: TemperatureSensor + 'static> TelemetrySampler<S> {
    /// A zero `period` is bumped to one millisecond.
    pub fn new(sensor: S, handle: ControllerHandle, period: Duration) -> Self {
        Self {
            sensor,
            handle,
            period: period.max(Duration::from_millis(1)),
            sequence: 0,
        }
    }

    /// Tick until stopped. Returns the number of frames produced.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            sensor = self.sensor.id(),
            period = ?self.period,
            "sampler started"
        );

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let Some(frame) = self.sample() else {
                continue;
            };
            if self.handle.submit_telemetry(frame).await.is_err() {
                debug!("controller gone, sampler exiting");
                break;
            }
        }

        info!(frames = self.sequence, "sampler stopped");
        self.sequence
    }

    /// Run on the current Tokio runtime.
    pub fn spawn(self) -> SamplerTask {
        let (stop_tx, stop_rx) = watch::channel(false);
        SamplerTask {
            stop: stop_tx,
            join: tokio::spawn(self.run(stop_rx)),
        }
    }

    fn sample(&mut self) -> Option<TelemetryFrame> {
        let snapshot = self.handle.snapshot();
        if !is_motion_allowed(snapshot.state) {
            trace!(state = %snapshot.state, "sampler idle");
            return None;
        }
        let temperatures = match self.sensor.read_all() {
            Ok(t) => t,
            Err(err) => {
                warn!(sensor = self.sensor.id(), %err, "temperature read failed");
                return None;
            }
        };
        self.sequence += 1;
        Some(TelemetryFrame::from_model(
            self.sequence,
            &snapshot.joints,
            temperatures,
        ))
    }
}

/// A spawned sampler and its stop switch.
pub struct SamplerTask {
    stop: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl SamplerTask {
    /// Signal the sampler and wait for it to finish. Returns the number of
    /// frames it produced.
    pub async fn stop(self) -> u64 {
        self.stop.send_replace(true);
        match self.join.await {
            Ok(frames) => frames,
            Err(err) => {
                warn!(%err, "sampler task failed");
                0
            }
        }
    }

    /// `true` once the task has exited on its own or been stopped.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, DEFAULT_QUEUE_DEPTH, UserCommand};
    use armctl_hal::ScriptedSensor;
    use armctl_kernel::Supervisor;
    use armctl_memory::PositionLog;
    use armctl_middleware::{EventBus, Topic};
    use armctl_types::{ArmError, EventPayload, JOINT_COUNT, SystemState};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_millis(5);

    fn controller(dir: &tempfile::TempDir) -> ControllerHandle {
        let log = PositionLog::new(dir.path().join("positions.json"));
        let (controller, handle) = Controller::new(
            Supervisor::default(),
            log,
            EventBus::default(),
            DEFAULT_QUEUE_DEPTH,
        );
        tokio::spawn(controller.run());
        handle
    }

    /// Fails on the first read, then reports a steady temperature.
    struct FlakySensor {
        reads: Arc<AtomicUsize>,
    }

    impl TemperatureSensor for FlakySensor {
        fn id(&self) -> &str {
            "flaky"
        }

        fn read_all(&mut self) -> Result<[f64; JOINT_COUNT], ArmError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ArmError::HardwareFault("bus timeout".into()));
            }
            Ok([31.0; JOINT_COUNT])
        }
    }

    #[tokio::test]
    async fn idle_while_off() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let handle = controller(&dir);
        let sensor = ScriptedSensor::new([30.0; JOINT_COUNT]);
        let task = TelemetrySampler::new(sensor, handle.clone(), PERIOD).spawn();

        tokio::time::sleep(PERIOD * 6).await;
        assert_eq!(task.stop().await, 0);
        assert!(handle.latest_telemetry().is_none());
    }

    #[tokio::test]
    async fn frames_mirror_joint_angles() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let handle = controller(&dir);
        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle
            .dispatch(UserCommand::SetJoint { index: 1, angle: 30.0 })
            .await
            .unwrap();

        let sensor = ScriptedSensor::new([33.0; JOINT_COUNT]);
        let task = TelemetrySampler::new(sensor, handle.clone(), PERIOD).spawn();
        let frame = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(frame) = handle.latest_telemetry() {
                    return frame;
                }
                tokio::time::sleep(PERIOD).await;
            }
        })
        .await
        .expect("a frame within the timeout");
        assert!(task.stop().await >= 1);

        let sample = &frame.samples[1];
        assert_eq!(sample.position_deg, 30);
        assert_eq!(sample.position_ticks, 300);
        assert!((sample.temperature_c - 33.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stop_signal_ends_the_task() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let handle = controller(&dir);
        let (stop_tx, stop_rx) = watch::channel(false);
        let sampler = TelemetrySampler::new(
            ScriptedSensor::new([30.0; JOINT_COUNT]),
            handle,
            Duration::from_secs(3600),
        );
        let join = tokio::spawn(sampler.run(stop_rx));

        stop_tx.send_replace(true);
        let frames = tokio::time::timeout(Duration::from_secs(2), join)
            .await
            .expect("sampler stops promptly")
            .unwrap();
        // The first interval tick fires immediately, but the arm is off.
        assert_eq!(frames, 0);
    }

    #[tokio::test]
    async fn failed_read_skips_the_tick() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let bus = EventBus::default();
        let mut telemetry = bus.subscribe_to(Topic::Telemetry);
        let log = PositionLog::new(dir.path().join("positions.json"));
        let (controller, handle) =
            Controller::new(Supervisor::default(), log, bus, DEFAULT_QUEUE_DEPTH);
        tokio::spawn(controller.run());
        handle.dispatch(UserCommand::PowerOn).await.unwrap();

        let reads = Arc::new(AtomicUsize::new(0));
        let sensor = FlakySensor { reads: reads.clone() };
        let task = TelemetrySampler::new(sensor, handle.clone(), PERIOD).spawn();
        let event = tokio::time::timeout(Duration::from_secs(2), telemetry.next())
            .await
            .expect("a frame after the failed read")
            .expect("bus open");
        task.stop().await;

        let EventPayload::Telemetry(frame) = event.payload else {
            panic!("expected a telemetry event, got {:?}", event.payload);
        };
        assert_eq!(frame.sequence, 1);
        assert!(reads.load(Ordering::SeqCst) >= 2);
        assert_eq!(handle.snapshot().state, SystemState::Ready);
    }

    #[tokio::test]
    async fn sampler_exits_when_controller_stops() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let log = PositionLog::new(dir.path().join("positions.json"));
        let (controller, handle) = Controller::new(
            Supervisor::default(),
            log,
            EventBus::default(),
            DEFAULT_QUEUE_DEPTH,
        );
        let controller = tokio::spawn(controller.run());
        handle.dispatch(UserCommand::PowerOn).await.unwrap();

        let task = TelemetrySampler::new(
            ScriptedSensor::new([30.0; JOINT_COUNT]),
            handle,
            PERIOD,
        )
        .spawn();
        controller.abort();
        let _ = controller.await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while !task.is_finished() {
                tokio::time::sleep(PERIOD).await;
            }
        })
        .await
        .expect("sampler exits once the queue is closed");
        assert!(task.stop().await >= 1);
    }

    #[tokio::test]
    async fn overheat_from_sampler_stops_the_arm() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let mut handle = controller(&dir);
        handle.dispatch(UserCommand::PowerOn).await.unwrap();
        handle.dispatch(UserCommand::StartRun).await.unwrap();

        let sensor =
            ScriptedSensor::new([30.0; JOINT_COUNT]).then([30.0, 30.0, 30.0, 30.0, 61.0, 30.0]);
        let task = TelemetrySampler::new(sensor, handle.clone(), PERIOD).spawn();

        tokio::time::timeout(Duration::from_secs(2), async {
            while handle.snapshot().state != SystemState::Emergency {
                if !handle.changed().await {
                    break;
                }
            }
        })
        .await
        .expect("emergency within the timeout");
        assert_eq!(handle.snapshot().state, SystemState::Emergency);

        // Sampling pauses in emergency.
        let produced = task.stop().await;
        tokio::time::sleep(PERIOD * 4).await;
        assert_eq!(handle.latest_telemetry().map(|f| f.sequence), Some(produced));
    }
}
