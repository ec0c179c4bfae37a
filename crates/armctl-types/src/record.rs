//! [`PositionRecord`] – persisted joint-model snapshot.
//!
//! Serialized as one JSON object per line:
//!
//! ```text
//! {"joints":[90,0,0,0,0,0],"gripper":false,"timestamp":"2024-05-01 12:30:00"}
//! ```

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::joint::{JOINT_COUNT, JointModel};

/// Snapshot of the joint model at a wall-clock second. Never mutated after
/// it is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub joints: [i32; JOINT_COUNT],
    /// `true` = closed.
    pub gripper: bool,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl PositionRecord {
    pub fn new(model: &JointModel, timestamp: NaiveDateTime) -> Self {
        Self {
            joints: model.angles(),
            gripper: model.gripper_closed(),
            timestamp: timestamp.with_nanosecond(0).unwrap_or(timestamp),
        }
    }

    /// Capture `model` at the current local time.
    pub fn capture(model: &JointModel) -> Self {
        Self::new(model, Local::now().naive_local())
    }
}

/// `YYYY-MM-DD HH:MM:SS` in local time.
mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
