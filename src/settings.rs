use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::sensors::{iio::DEFAULT_IIO_ROOT, BackendPreference};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const DEFAULT_SETTINGS_FILE: &str = "shadowtrace.json";
pub const CONFIG_PATH_ENV: &str = "SHADOWTRACE_CONFIG";
pub const DB_PATH_ENV: &str = "SHADOWTRACE_DB";
pub const BACKEND_ENV: &str = "SHADOWTRACE_BACKEND";

const MIN_CADENCE_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub db_path: PathBuf,
    pub backend: BackendPreference,
    pub cadence_ms: u64,
    pub cluster_count: usize,
    pub summary_interval_secs: u64,
    pub iio_root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("shadowtrace.db"),
            backend: BackendPreference::Auto,
            cadence_ms: 200,
            cluster_count: 3,
            summary_interval_secs: 10,
            iio_root: PathBuf::from(DEFAULT_IIO_ROOT),
        }
    }
}

impl Settings {
    /// Settings file named by `SHADOWTRACE_CONFIG` (or `shadowtrace.json`), then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
        Ok(Self::from_path(&path)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Missing file means defaults; a malformed one is reported and ignored.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                log_warn!("Ignoring invalid settings in {}: {err}", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(DB_PATH_ENV).filter(|value| !value.trim().is_empty()) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(raw) = lookup(BACKEND_ENV) {
            match BackendPreference::parse(&raw) {
                Some(backend) => self.backend = backend,
                None => log_warn!("Ignoring unknown {BACKEND_ENV} value '{raw}'"),
            }
        }
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms.max(MIN_CADENCE_MS))
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs.max(1))
    }
}
