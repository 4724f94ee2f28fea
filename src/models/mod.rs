pub mod reading;

pub use reading::{clamp_light, reading_timestamp, SensorReading, MAX_LIGHT_LUX, MIN_LIGHT_LUX};
