use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};

pub const MIN_LIGHT_LUX: f64 = 0.0;
pub const MAX_LIGHT_LUX: f64 = 2000.0;

/// One sample produced by a sensor backend.
///
/// Fields of an unavailable sub-sensor are reported as `0.0`, never omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub timestamp: DateTime<Local>,
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub light_level: f64,
    pub is_moving: bool,
}

impl SensorReading {
    pub fn acceleration(&self) -> [f64; 3] {
        [self.acc_x, self.acc_y, self.acc_z]
    }
}

/// Wall-clock timestamp at the precision the store keeps (microseconds).
pub fn reading_timestamp(now: DateTime<Local>) -> DateTime<Local> {
    now.trunc_subsecs(6)
}

pub fn clamp_light(lux: f64) -> f64 {
    if lux.is_nan() {
        return MIN_LIGHT_LUX;
    }
    lux.clamp(MIN_LIGHT_LUX, MAX_LIGHT_LUX)
}
