//! `armctl-memory` – persisted arm positions.
//!
//! # Modules
//!
//! - [`position_log`] – [`PositionLog`][position_log::PositionLog]: an
//!   append-only NDJSON file of [`PositionRecord`][armctl_types::PositionRecord]s.

pub mod position_log;

pub use position_log::{PositionLog, PositionLogError};
