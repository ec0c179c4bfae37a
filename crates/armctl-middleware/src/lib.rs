//! `armctl-middleware` – observer plumbing.
//!
//! Moves telemetry, render snapshots and audit records from the controller
//! to whoever is watching (the operator console, log shippers, tests)
//! without the controller knowing who they are.
//!
//! # Modules
//!
//! - [`bus`] – topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
