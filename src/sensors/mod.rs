//! Sensor backends.
//!
//! Every backend implements [`Sensor`]: constructed idle, `start()`, any number of
//! `get_reading()` calls, then `stop()`. `stop()` is idempotent and a stopped backend
//! answers `get_reading()` with `None` until it is started again.

pub mod iio;
pub mod native;
pub mod selector;
pub mod simulated;

use anyhow::Result;

use crate::models::SensorReading;

pub use iio::IioPlatform;
pub use native::{NativeSensor, SensorPlatform};
pub use selector::{
    probe_hardware, select_sensor, try_native, BackendKind, BackendPreference, ProbeReport,
    SelectionReason, SensorSelection,
};
pub use simulated::SimulatedSensor;

pub trait Sensor: Send {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    /// One hardware or simulation step. `None` while the backend is not running.
    fn get_reading(&mut self) -> Option<SensorReading>;

    fn kind(&self) -> BackendKind;
}
