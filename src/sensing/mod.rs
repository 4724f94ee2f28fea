pub mod controller;
pub mod latest;
mod loop_worker;

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::{anyhow, Context, Result};

use crate::{
    db::Database,
    sensors::{select_sensor, IioPlatform, SensorPlatform},
    settings::Settings,
};

pub use controller::{DaemonState, SamplingDaemon};
pub use latest::{LatestReading, LatestSnapshot};

static DAEMON: OnceLock<SamplingDaemon> = OnceLock::new();
static INIT_GUARD: Mutex<()> = Mutex::new(());

/// Builds a daemon from settings: opens the store and selects the sensor backend.
/// The daemon is returned idle.
pub fn build_daemon(settings: &Settings) -> Result<SamplingDaemon> {
    let db = Database::new(settings.db_path.clone())?;

    let iio_root = settings.iio_root.clone();
    let (sensor, selection) = select_sensor(settings.backend, move || {
        let platform = IioPlatform::detect(iio_root)?;
        Ok(Arc::new(platform) as Arc<dyn SensorPlatform>)
    });

    Ok(SamplingDaemon::new(sensor, selection, db, settings.cadence()))
}

/// The process-wide daemon, created and started on first access.
///
/// Later calls return the same instance and ignore `settings`.
pub fn get_logger(settings: &Settings) -> Result<&'static SamplingDaemon> {
    if let Some(daemon) = DAEMON.get() {
        return Ok(daemon);
    }

    let _guard = INIT_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(daemon) = DAEMON.get() {
        return Ok(daemon);
    }

    let daemon = build_daemon(settings).context("failed to build sampling daemon")?;
    daemon.start()?;
    if DAEMON.set(daemon).is_err() {
        return Err(anyhow!("sampling daemon registered twice"));
    }
    DAEMON
        .get()
        .ok_or_else(|| anyhow!("sampling daemon missing after registration"))
}
