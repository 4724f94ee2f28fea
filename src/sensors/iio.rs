//! Linux Industrial I/O (sysfs) binding for the native adapter.
//!
//! Accelerometers expose `in_accel_{x,y,z}_raw` plus an optional `in_accel_scale`
//! (raw × scale = m/s²). Ambient light sensors expose `in_illuminance_input` (lux) or
//! `in_illuminance_raw` with an optional `in_illuminance_scale`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use super::native::{Accelerometer, LightSensor, SensorPlatform};

pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";
const STANDARD_GRAVITY: f64 = 9.80665;

const ACCEL_AXES: [&str; 3] = ["in_accel_x_raw", "in_accel_y_raw", "in_accel_z_raw"];
const ACCEL_SCALE: &str = "in_accel_scale";
const LIGHT_INPUT: &str = "in_illuminance_input";
const LIGHT_RAW: &str = "in_illuminance_raw";
const LIGHT_SCALE: &str = "in_illuminance_scale";

#[derive(Debug, Clone)]
pub struct IioPlatform {
    root: PathBuf,
}

impl IioPlatform {
    /// Fails when the IIO device tree itself is missing, i.e. the platform has no sensor support.
    pub fn detect(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("IIO device tree not found at {}", root.display());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First device directory (in name order) that contains every file in `required`.
    fn find_device(&self, required: &[&str]) -> Result<Option<PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        devices.sort();

        Ok(devices
            .into_iter()
            .find(|dir| required.iter().all(|file| dir.join(file).is_file())))
    }
}

impl SensorPlatform for IioPlatform {
    fn name(&self) -> &str {
        "iio"
    }

    fn default_accelerometer(&self) -> Result<Option<Box<dyn Accelerometer>>> {
        let Some(dir) = self.find_device(&ACCEL_AXES)? else {
            return Ok(None);
        };
        let scale = read_optional_value(&dir.join(ACCEL_SCALE))?.unwrap_or(1.0);
        Ok(Some(Box::new(IioAccelerometer { dir, scale })))
    }

    fn default_light_sensor(&self) -> Result<Option<Box<dyn LightSensor>>> {
        if let Some(dir) = self.find_device(&[LIGHT_INPUT])? {
            return Ok(Some(Box::new(IioLightSensor {
                path: dir.join(LIGHT_INPUT),
                scale: 1.0,
            })));
        }
        let Some(dir) = self.find_device(&[LIGHT_RAW])? else {
            return Ok(None);
        };
        let scale = read_optional_value(&dir.join(LIGHT_SCALE))?.unwrap_or(1.0);
        Ok(Some(Box::new(IioLightSensor {
            path: dir.join(LIGHT_RAW),
            scale,
        })))
    }
}

struct IioAccelerometer {
    dir: PathBuf,
    scale: f64,
}

impl Accelerometer for IioAccelerometer {
    fn current_reading(&mut self) -> Result<Option<[f64; 3]>> {
        let mut values = [0.0; 3];
        for (value, axis) in values.iter_mut().zip(ACCEL_AXES) {
            *value = read_value(&self.dir.join(axis))? * self.scale / STANDARD_GRAVITY;
        }
        Ok(Some(values))
    }
}

struct IioLightSensor {
    path: PathBuf,
    scale: f64,
}

impl LightSensor for IioLightSensor {
    fn current_reading(&mut self) -> Result<Option<f64>> {
        Ok(Some(read_value(&self.path)? * self.scale))
    }
}

fn read_value(path: &Path) -> Result<f64> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("invalid value '{}' in {}", raw.trim(), path.display()))
}

fn read_optional_value(path: &Path) -> Result<Option<f64>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_value(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct FakeTree(PathBuf);

    impl FakeTree {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("shadowtrace-iio-{}", Uuid::new_v4()));
            fs::create_dir_all(&root).unwrap();
            Self(root)
        }

        fn device(&self, name: &str, files: &[(&str, &str)]) {
            let dir = self.0.join(name);
            fs::create_dir_all(&dir).unwrap();
            for (file, contents) in files {
                fs::write(dir.join(file), contents).unwrap();
            }
        }
    }

    impl Drop for FakeTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn missing_tree_is_platform_error() {
        let missing = std::env::temp_dir().join(format!("shadowtrace-none-{}", Uuid::new_v4()));
        assert!(IioPlatform::detect(missing).is_err());
    }

    #[test]
    fn reads_scaled_acceleration_in_g() {
        let tree = FakeTree::new();
        tree.device(
            "iio:device0",
            &[
                ("in_accel_x_raw", "0\n"),
                ("in_accel_y_raw", "-100\n"),
                ("in_accel_z_raw", "980.665\n"),
                ("in_accel_scale", "0.01\n"),
            ],
        );

        let platform = IioPlatform::detect(&tree.0).unwrap();
        let mut accel = platform.default_accelerometer().unwrap().unwrap();
        let [x, y, z] = accel.current_reading().unwrap().unwrap();
        assert_eq!(x, 0.0);
        assert!((y + 1.0 / STANDARD_GRAVITY).abs() < 1e-9);
        assert!((z - 1.0).abs() < 1e-9);
        assert!(platform.default_light_sensor().unwrap().is_none());
    }

    #[test]
    fn prefers_processed_illuminance() {
        let tree = FakeTree::new();
        tree.device(
            "iio:device0",
            &[("in_illuminance_raw", "10"), ("in_illuminance_scale", "2.5")],
        );
        tree.device("iio:device1", &[("in_illuminance_input", "321.5")]);

        let platform = IioPlatform::detect(&tree.0).unwrap();
        let mut light = platform.default_light_sensor().unwrap().unwrap();
        assert_eq!(light.current_reading().unwrap(), Some(321.5));
        assert!(platform.default_accelerometer().unwrap().is_none());
    }

    #[test]
    fn raw_illuminance_uses_scale() {
        let tree = FakeTree::new();
        tree.device(
            "iio:device3",
            &[("in_illuminance_raw", "10"), ("in_illuminance_scale", "2.5")],
        );

        let platform = IioPlatform::detect(&tree.0).unwrap();
        let mut light = platform.default_light_sensor().unwrap().unwrap();
        assert_eq!(light.current_reading().unwrap(), Some(25.0));
    }

    #[test]
    fn garbage_value_is_read_error() {
        let tree = FakeTree::new();
        tree.device("iio:device0", &[("in_illuminance_input", "n/a")]);

        let platform = IioPlatform::detect(&tree.0).unwrap();
        let mut light = platform.default_light_sensor().unwrap().unwrap();
        assert!(light.current_reading().is_err());
    }
}
