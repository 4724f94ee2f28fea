//! Rows read back from `sensor_logs`.

use serde::{Deserialize, Serialize};

use crate::models::SensorReading;

/// A persisted reading. `cluster_id` stays `None` until clustering assigns a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cluster_id: Option<usize>,
}

/// Moving-sample count for one local hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyActivity {
    pub hour: u32,
    pub activity_count: u64,
}
