//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber sees every
//! event on its topic and a slow subscriber never blocks the controller.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | One [`TelemetryFrame`](armctl_types::TelemetryFrame) per sampler tick |
//! | [`Topic::Render`] | Render snapshot after every geometry-affecting change |
//! | [`Topic::Audit`] | Every audit record, in emission order |
//! | [`Topic::SystemAlerts`] | State changes and emergency stops |

use armctl_types::Event;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Telemetry,
    Render,
    Audit,
    SystemAlerts,
}

/// Shared event bus. Clones share the same channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Event>,
    render: broadcast::Sender<Event>,
    audit: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus; `capacity` applies to each topic independently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (a [`broadcast`] requirement).
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (render, _) = broadcast::channel(capacity);
        let (audit, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            telemetry,
            render,
            audit,
            system_alerts,
        }
    }

    /// Publish `event` on `topic`.
    ///
    /// Returns the number of subscribers handed the event. Nobody listening
    /// is normal for an observer bus and yields `0`.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        match self.topic_sender(topic).send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => {
                trace!(?topic, "no subscribers");
                0
            }
        }
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Current number of subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Render => &self.render,
            Topic::Audit => &self.audit,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to one [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Next event, surfacing `Lagged` and `Closed` to the caller.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Next event, skipping over lag. `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking drain of everything currently buffered.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                }
                Err(_) => return events,
            }
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armctl_types::{AuditLevel, AuditRecord, EventPayload, SystemState};

    fn audit_event(msg: &str) -> Event {
        Event::new(
            "armctl-middleware::test",
            EventPayload::Audit(AuditRecord::new(AuditLevel::Info, msg)),
        )
    }

    fn alert_event() -> Event {
        Event::new(
            "armctl-middleware::test",
            EventPayload::StateChanged {
                from: SystemState::Off,
                to: SystemState::Ready,
            },
        )
    }

    #[test]
    fn publish_without_subscribers_is_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.publish_to(Topic::Telemetry, audit_event("x")), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut a = bus.subscribe_to(Topic::Audit);
        let mut b = bus.subscribe_to(Topic::Audit);
        assert_eq!(bus.subscriber_count(Topic::Audit), 2);

        let event = audit_event("Arm powered on");
        assert_eq!(bus.publish_to(Topic::Audit, event.clone()), 2);

        assert_eq!(a.recv().await?.id, event.id);
        assert_eq!(b.recv().await?.id, event.id);
        Ok(())
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let audit = bus.subscribe_to(Topic::Audit);
        assert_eq!(alerts.topic(), Topic::SystemAlerts);
        assert_eq!(audit.topic(), Topic::Audit);

        bus.publish_to(Topic::Audit, audit_event("not an alert"));

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "alerts subscriber must not see audit traffic");
    }

    #[tokio::test]
    async fn next_skips_lag() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::SystemAlerts);
        for _ in 0..32 {
            bus.publish_to(Topic::SystemAlerts, alert_event());
        }
        assert!(slow.next().await.is_some());
    }

    #[test]
    fn drain_preserves_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Audit);
        for msg in ["one", "two", "three"] {
            bus.publish_to(Topic::Audit, audit_event(msg));
        }
        let messages: Vec<String> = rx
            .drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::Audit(r) => Some(r.message),
                _ => None,
            })
            .collect();
        assert_eq!(messages, ["one", "two", "three"]);
        assert!(rx.drain().is_empty());
    }
}
