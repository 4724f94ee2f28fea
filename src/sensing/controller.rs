use std::{
    sync::{atomic::Ordering, mpsc, Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    db::Database,
    models::SensorReading,
    sensors::{Sensor, SensorSelection},
};

use super::{
    latest::{LatestReading, LatestSnapshot},
    loop_worker::{sampling_loop, SamplerContext, SamplerCounters, SharedSensor},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DaemonState {
    Idle,
    Running,
    Stopped,
}

struct Worker {
    state: DaemonState,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

/// Owns the active sensor and the background sampling thread.
///
/// `start()` is a no-op while running, so repeated initialisation from the outside
/// never spawns a second loop. `stop()` returns only after the loop thread has exited.
pub struct SamplingDaemon {
    sensor: SharedSensor,
    selection: SensorSelection,
    db: Database,
    cadence: Duration,
    latest: Arc<LatestReading>,
    counters: Arc<SamplerCounters>,
    worker: Mutex<Worker>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SamplingDaemon {
    pub fn new(
        sensor: Box<dyn Sensor>,
        selection: SensorSelection,
        db: Database,
        cadence: Duration,
    ) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            selection,
            db,
            cadence,
            latest: Arc::new(LatestReading::new()),
            counters: Arc::new(SamplerCounters::default()),
            worker: Mutex::new(Worker {
                state: DaemonState::Idle,
                handle: None,
                cancel_token: None,
            }),
        }
    }

    pub fn start(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        if worker.state == DaemonState::Running {
            log_debug!("sampling daemon already running; start ignored");
            return Ok(());
        }

        lock(&self.sensor)
            .start()
            .context("failed to start sensor backend")?;

        let cancel_token = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let db = self.db.clone();
        let sensor = Arc::clone(&self.sensor);
        let latest = Arc::clone(&self.latest);
        let counters = Arc::clone(&self.counters);
        let cadence = self.cadence;
        let token = cancel_token.clone();

        let spawned = thread::Builder::new()
            .name("shadowtrace-sampler".into())
            .spawn(move || {
                // The writer connection is opened on, and never leaves, this thread.
                let setup = db.open_writer().and_then(|writer| {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .enable_time()
                        .build()
                        .context("failed to build sampler runtime")?;
                    Ok((writer, runtime))
                });

                let (writer, runtime) = match setup {
                    Ok(parts) => parts,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    log_error!("sampler readiness receiver dropped");
                    return;
                }

                let ctx = SamplerContext {
                    sensor,
                    writer,
                    latest,
                    counters,
                    cadence,
                };
                runtime.block_on(sampling_loop(ctx, token));
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                lock(&self.sensor).stop();
                return Err(anyhow::Error::new(err).context("failed to spawn sampler thread"));
            }
        };

        let ready = ready_rx
            .recv()
            .context("sampler thread exited before signaling readiness")
            .and_then(|result| result);
        if let Err(err) = ready {
            lock(&self.sensor).stop();
            let _ = handle.join();
            return Err(err.context("sampling daemon failed to start"));
        }

        worker.state = DaemonState::Running;
        worker.handle = Some(handle);
        worker.cancel_token = Some(cancel_token);

        log_info!(
            "Sampling daemon started ({}, every {} ms)",
            self.selection.mode_label(),
            self.cadence.as_millis()
        );
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let mut worker = lock(&self.worker);

        if let Some(token) = worker.cancel_token.take() {
            token.cancel();
        }
        lock(&self.sensor).stop();

        let joined = match worker.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("sampler thread panicked")),
            None => Ok(()),
        };

        if worker.state == DaemonState::Running {
            worker.state = DaemonState::Stopped;
            log_info!(
                "Sampling daemon stopped after {} samples",
                self.samples_written()
            );
        }
        joined
    }

    pub fn state(&self) -> DaemonState {
        lock(&self.worker).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == DaemonState::Running
    }

    pub fn selection(&self) -> &SensorSelection {
        &self.selection
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn latest_reading(&self) -> Option<SensorReading> {
        self.latest.reading()
    }

    pub fn latest_snapshot(&self) -> Option<LatestSnapshot> {
        self.latest.snapshot()
    }

    pub fn samples_written(&self) -> u64 {
        self.counters.samples_written.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.counters.write_failures.load(Ordering::Relaxed)
    }
}

impl Drop for SamplingDaemon {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                log_error!("Failed to stop sampling daemon: {err:#}");
            }
        }
    }
}
