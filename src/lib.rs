pub mod analysis;
pub mod db;
pub mod models;
pub mod sensing;
pub mod sensors;
pub mod settings;
pub mod utils;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use tokio::time::MissedTickBehavior;

use analysis::{active_seconds, calculate_daily_stat, cluster_sizes, run_clustering};
use sensing::{get_logger, SamplingDaemon};
use sensors::{probe_hardware, IioPlatform, SensorPlatform};
use settings::{Settings, DEFAULT_SETTINGS_FILE};

const ENABLE_LOGS: bool = true;

/// Newest rows fed to the periodic clustering summary (about ten minutes at 5 Hz).
const CLUSTER_WINDOW: usize = 3_000;

/// Entry point of the `shadowtrace` binary.
///
/// `probe` reports sensor hardware and exits, `write-config [path]` writes the default
/// settings file, and no argument runs the sampler until Ctrl-C.
pub async fn run() -> Result<()> {
    utils::init_logging();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("probe") => {
            let settings = Settings::load()?;
            probe(&settings);
            Ok(())
        }
        Some("write-config") => {
            let path = args
                .next()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
            Settings::default().save(&path)?;
            log_info!("Wrote default settings to {}", path.display());
            Ok(())
        }
        Some(other) => Err(anyhow!(
            "unknown command '{other}' (expected 'probe' or 'write-config')"
        )),
        None => {
            let settings = Settings::load()?;
            run_daemon(settings).await
        }
    }
}

fn probe(settings: &Settings) {
    let root = settings.iio_root.clone();
    let report = probe_hardware(move || {
        Ok(Arc::new(IioPlatform::detect(root)?) as Arc<dyn SensorPlatform>)
    });
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => log_error!("Failed to render probe report: {err}"),
    }
}

async fn run_daemon(settings: Settings) -> Result<()> {
    log_info!("ShadowTrace starting up...");

    let startup_settings = settings.clone();
    let daemon = tokio::task::spawn_blocking(move || get_logger(&startup_settings)).await??;

    let selection = daemon.selection();
    log_info!(
        "{} via {:?} backend, writing to {}",
        selection.mode_label(),
        selection.backend,
        daemon.database().path().display()
    );
    if let Some(caption) = selection.caption() {
        log_info!("{caption}");
    }

    let mut ticker = tokio::time::interval(settings.summary_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; nothing has been sampled yet.
    ticker.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    log_error!("Failed to listen for Ctrl-C: {err}");
                }
                log_info!("Interrupt received, stopping sampler");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = log_summary(daemon, settings.cluster_count).await {
                    log_error!("Failed to summarise today's readings: {err:#}");
                }
            }
        }
    }

    tokio::task::spawn_blocking(move || daemon.stop()).await??;
    log_info!(
        "Sampler stopped after {} samples ({} write failures)",
        daemon.samples_written(),
        daemon.write_failures()
    );
    Ok(())
}

async fn log_summary(daemon: &SamplingDaemon, cluster_count: usize) -> Result<()> {
    let db = daemon.database();

    if let Some(reading) = daemon.latest_reading() {
        log_info!(
            "latest: acc=({:.3}, {:.3}, {:.3}) light={:.1} lux moving={}",
            reading.acc_x,
            reading.acc_y,
            reading.acc_z,
            reading.light_level,
            reading.is_moving
        );
    }

    let rows = db.get_todays_logs().await?;
    let moving = calculate_daily_stat(&rows);
    log_info!(
        "today: {} samples, {} moving (~{:.1} active minutes)",
        rows.len(),
        moving,
        active_seconds(moving) / 60.0
    );

    let hourly = db.get_hourly_activity().await?;
    if !hourly.is_empty() {
        let buckets: Vec<String> = hourly
            .iter()
            .map(|bucket| format!("{:02}h={}", bucket.hour, bucket.activity_count))
            .collect();
        log_info!("hourly activity: {}", buckets.join(" "));
    }

    let recent: Vec<_> = rows.into_iter().take(CLUSTER_WINDOW).collect();
    let clustered =
        tokio::task::spawn_blocking(move || run_clustering(recent, cluster_count)).await?;
    let sizes = cluster_sizes(&clustered);
    if !sizes.is_empty() {
        let sizes: Vec<String> = sizes
            .iter()
            .map(|(cluster, count)| format!("#{cluster}={count}"))
            .collect();
        log_info!("movement clusters (latest {CLUSTER_WINDOW} rows): {}", sizes.join(" "));
    }

    Ok(())
}
