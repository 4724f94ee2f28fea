use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use anyhow::Result;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    db::{helpers::is_transient, LogWriter},
    models::SensorReading,
    sensors::Sensor,
};

use super::latest::LatestReading;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const MAX_WRITE_RETRIES: u32 = 3;
const WRITE_RETRY_BACKOFF: Duration = Duration::from_millis(25);

pub(crate) type SharedSensor = Arc<Mutex<Box<dyn Sensor>>>;

#[derive(Debug, Default)]
pub struct SamplerCounters {
    pub samples_written: AtomicU64,
    pub write_failures: AtomicU64,
    pub empty_polls: AtomicU64,
}

pub(crate) struct SamplerContext {
    pub sensor: SharedSensor,
    pub writer: LogWriter,
    pub latest: Arc<LatestReading>,
    pub counters: Arc<SamplerCounters>,
    pub cadence: Duration,
}

/// Polls the sensor once per cadence tick until cancelled. A tick that is already
/// running finishes (including its write) before cancellation is observed.
pub(crate) async fn sampling_loop(mut ctx: SamplerContext, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                poll_once(&mut ctx).await;
            }
        }
    }
}

async fn poll_once(ctx: &mut SamplerContext) {
    let reading = ctx
        .sensor
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_reading();

    let Some(reading) = reading else {
        ctx.counters.empty_polls.fetch_add(1, Ordering::Relaxed);
        return;
    };

    ctx.latest.publish(reading.clone());

    match persist(&mut ctx.writer, &reading).await {
        Ok(_) => {
            ctx.counters.samples_written.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            ctx.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            log_error!("failed to persist reading from {}: {err:#}", reading.timestamp);
        }
    }
}

async fn persist(writer: &mut LogWriter, reading: &SensorReading) -> Result<i64> {
    let mut attempt = 0;
    loop {
        match writer.append(reading) {
            Ok(id) => return Ok(id),
            Err(err) if attempt < MAX_WRITE_RETRIES && is_transient(&err) => {
                attempt += 1;
                log_warn!("store busy, retrying write ({attempt}/{MAX_WRITE_RETRIES})");
                tokio::time::sleep(WRITE_RETRY_BACKOFF * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
