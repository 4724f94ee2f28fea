//! Backend selection, evaluated once per daemon lifetime.
//!
//! The native adapter is probed first; any failure to construct it, start it, or find at
//! least one sub-sensor falls back to the simulator. The outcome and its reason are kept
//! so the operator can be told whether data is real or simulated.

use std::{fmt, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{NativeSensor, Sensor, SensorPlatform, SimulatedSensor};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Native,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Simulated,
    Native,
}

impl BackendPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "simulated" | "simulation" | "sim" => Some(Self::Simulated),
            "native" | "hardware" => Some(Self::Native),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SelectionReason {
    HardwareDetected,
    ForcedByConfig,
    PlatformUnavailable(String),
    NoSubSensors,
    StartFailed(String),
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareDetected => write!(f, "sensor hardware detected"),
            Self::ForcedByConfig => write!(f, "simulation forced by configuration"),
            Self::PlatformUnavailable(detail) => {
                write!(f, "sensor platform unavailable: {detail}")
            }
            Self::NoSubSensors => write!(f, "no accelerometer or light sensor found"),
            Self::StartFailed(detail) => write!(f, "native sensor failed to start: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSelection {
    pub backend: BackendKind,
    pub reason: SelectionReason,
}

impl SensorSelection {
    pub fn is_simulated(&self) -> bool {
        self.backend == BackendKind::Simulated
    }

    pub fn mode_label(&self) -> &'static str {
        match self.backend {
            BackendKind::Native => "Real Sensors",
            BackendKind::Simulated => "Simulation Mode",
        }
    }

    /// Operator-facing explanation of a fallback; `None` when real hardware is in use.
    pub fn caption(&self) -> Option<String> {
        match self.backend {
            BackendKind::Native => None,
            BackendKind::Simulated => Some(format!("Using simulated data ({}).", self.reason)),
        }
    }
}

/// Result of a hardware check without committing to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub platform_available: bool,
    pub accelerometer: bool,
    pub light_sensor: bool,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn native_usable(&self) -> bool {
        self.platform_available && (self.accelerometer || self.light_sensor)
    }
}

/// Builds and checks the native adapter. The adapter is returned stopped; the daemon
/// starts it again when sampling begins.
pub fn try_native<F>(platform: F) -> Result<NativeSensor, SelectionReason>
where
    F: FnOnce() -> Result<Arc<dyn SensorPlatform>>,
{
    let platform = platform().map_err(|err| SelectionReason::PlatformUnavailable(format!("{err:#}")))?;
    let mut sensor = NativeSensor::new(platform);

    if let Err(err) = sensor.start() {
        sensor.stop();
        return Err(SelectionReason::StartFailed(format!("{err:#}")));
    }

    let usable = sensor.has_accelerometer() || sensor.has_light_sensor();
    sensor.stop();

    if usable {
        Ok(sensor)
    } else {
        Err(SelectionReason::NoSubSensors)
    }
}

pub fn select_sensor<F>(
    preference: BackendPreference,
    platform: F,
) -> (Box<dyn Sensor>, SensorSelection)
where
    F: FnOnce() -> Result<Arc<dyn SensorPlatform>>,
{
    if preference == BackendPreference::Simulated {
        log_info!("Using simulated sensor (forced by configuration)");
        return (
            Box::new(SimulatedSensor::new()),
            SensorSelection {
                backend: BackendKind::Simulated,
                reason: SelectionReason::ForcedByConfig,
            },
        );
    }

    match try_native(platform) {
        Ok(sensor) => {
            log_info!("Using native sensor");
            (
                Box::new(sensor),
                SensorSelection {
                    backend: BackendKind::Native,
                    reason: SelectionReason::HardwareDetected,
                },
            )
        }
        Err(reason) => {
            if preference == BackendPreference::Native {
                log_warn!("native sensor requested but unusable ({reason}); falling back");
            } else {
                log_info!("Using simulated sensor: {reason}");
            }
            (
                Box::new(SimulatedSensor::new()),
                SensorSelection {
                    backend: BackendKind::Simulated,
                    reason,
                },
            )
        }
    }
}

pub fn probe_hardware<F>(platform: F) -> ProbeReport
where
    F: FnOnce() -> Result<Arc<dyn SensorPlatform>>,
{
    let platform = match platform() {
        Ok(platform) => platform,
        Err(err) => {
            return ProbeReport {
                platform_available: false,
                accelerometer: false,
                light_sensor: false,
                error: Some(format!("{err:#}")),
            }
        }
    };

    let mut sensor = NativeSensor::new(platform);
    let start_result = sensor.start();
    let report = ProbeReport {
        platform_available: true,
        accelerometer: sensor.has_accelerometer(),
        light_sensor: sensor.has_light_sensor(),
        error: start_result.err().map(|err| format!("{err:#}")),
    };
    sensor.stop();
    report
}
