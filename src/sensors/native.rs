//! Adapter over platform accelerometer and light primitives.
//!
//! Each sub-sensor is bound independently on `start()`; a missing one reports zeros.
//! Movement is a per-sample magnitude check against 1 g with no temporal filtering,
//! so it produces false positives on tilt and misses smooth motion.

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;

use crate::models::{clamp_light, reading_timestamp, SensorReading};

use super::{BackendKind, Sensor};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Allowed deviation of the acceleration magnitude from 1 g before a sample counts as moving.
pub const NATIVE_MOVING_THRESHOLD: f64 = 0.1;
const THRESHOLD_TOLERANCE: f64 = 1e-9;

/// Acceleration in g along x, y and z.
pub trait Accelerometer: Send {
    fn current_reading(&mut self) -> Result<Option<[f64; 3]>>;
}

/// Illuminance in lux.
pub trait LightSensor: Send {
    fn current_reading(&mut self) -> Result<Option<f64>>;
}

/// Source of default hardware instances. Returning `Ok(None)` means the device is absent.
pub trait SensorPlatform: Send + Sync {
    fn name(&self) -> &str;

    fn default_accelerometer(&self) -> Result<Option<Box<dyn Accelerometer>>>;

    fn default_light_sensor(&self) -> Result<Option<Box<dyn LightSensor>>>;
}

pub struct NativeSensor {
    platform: Arc<dyn SensorPlatform>,
    accelerometer: Option<Box<dyn Accelerometer>>,
    light_sensor: Option<Box<dyn LightSensor>>,
    running: bool,
}

impl NativeSensor {
    pub fn new(platform: Arc<dyn SensorPlatform>) -> Self {
        Self {
            platform,
            accelerometer: None,
            light_sensor: None,
            running: false,
        }
    }

    pub fn has_accelerometer(&self) -> bool {
        self.accelerometer.is_some()
    }

    pub fn has_light_sensor(&self) -> bool {
        self.light_sensor.is_some()
    }

    fn read_acceleration(&mut self) -> [f64; 3] {
        let Some(accelerometer) = self.accelerometer.as_mut() else {
            return [0.0; 3];
        };
        match accelerometer.current_reading() {
            Ok(Some(values)) => values,
            Ok(None) => [0.0; 3],
            Err(err) => {
                log_warn!("accelerometer read failed: {err:#}");
                [0.0; 3]
            }
        }
    }

    fn read_light(&mut self) -> f64 {
        let Some(light_sensor) = self.light_sensor.as_mut() else {
            return 0.0;
        };
        match light_sensor.current_reading() {
            Ok(Some(lux)) => clamp_light(lux),
            Ok(None) => 0.0,
            Err(err) => {
                log_warn!("light sensor read failed: {err:#}");
                0.0
            }
        }
    }
}

impl Sensor for NativeSensor {
    fn start(&mut self) -> Result<()> {
        self.accelerometer = match self.platform.default_accelerometer() {
            Ok(device) => device,
            Err(err) => {
                log_warn!("binding accelerometer on {} failed: {err:#}", self.platform.name());
                None
            }
        };
        self.light_sensor = match self.platform.default_light_sensor() {
            Ok(device) => device,
            Err(err) => {
                log_warn!("binding light sensor on {} failed: {err:#}", self.platform.name());
                None
            }
        };
        self.running = true;

        log_info!(
            "native sensor on {}: accelerometer={}, light={}",
            self.platform.name(),
            self.has_accelerometer(),
            self.has_light_sensor()
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.accelerometer = None;
        self.light_sensor = None;
    }

    fn get_reading(&mut self) -> Option<SensorReading> {
        if !self.running {
            return None;
        }

        let acc = self.read_acceleration();
        let light_level = self.read_light();

        Some(SensorReading {
            timestamp: reading_timestamp(Local::now()),
            acc_x: acc[0],
            acc_y: acc[1],
            acc_z: acc[2],
            light_level,
            is_moving: is_native_moving(acc),
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }
}

/// `true` when the magnitude deviates from 1 g by more than 10%.
///
/// The comparison carries a tiny tolerance so that a magnitude of exactly 1.1 or 0.9,
/// which is not representable in binary floating point, is not flagged.
pub fn is_native_moving([x, y, z]: [f64; 3]) -> bool {
    let magnitude = (x * x + y * y + z * z).sqrt();
    (magnitude - 1.0).abs() - NATIVE_MOVING_THRESHOLD > THRESHOLD_TOLERANCE
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::bail;

    struct FixedAccelerometer([f64; 3]);

    impl Accelerometer for FixedAccelerometer {
        fn current_reading(&mut self) -> Result<Option<[f64; 3]>> {
            Ok(Some(self.0))
        }
    }

    struct FixedLight(f64);

    impl LightSensor for FixedLight {
        fn current_reading(&mut self) -> Result<Option<f64>> {
            Ok(Some(self.0))
        }
    }

    struct BrokenLight;

    impl LightSensor for BrokenLight {
        fn current_reading(&mut self) -> Result<Option<f64>> {
            bail!("device went away")
        }
    }

    /// In-memory platform with optional sub-sensors.
    pub(crate) struct FakePlatform {
        pub accel: Option<[f64; 3]>,
        pub light: Option<f64>,
        pub broken_light: bool,
    }

    impl SensorPlatform for FakePlatform {
        fn name(&self) -> &str {
            "fake"
        }

        fn default_accelerometer(&self) -> Result<Option<Box<dyn Accelerometer>>> {
            Ok(self
                .accel
                .map(|values| Box::new(FixedAccelerometer(values)) as Box<dyn Accelerometer>))
        }

        fn default_light_sensor(&self) -> Result<Option<Box<dyn LightSensor>>> {
            if self.broken_light {
                return Ok(Some(Box::new(BrokenLight)));
            }
            Ok(self
                .light
                .map(|lux| Box::new(FixedLight(lux)) as Box<dyn LightSensor>))
        }
    }

    fn sensor(accel: Option<[f64; 3]>, light: Option<f64>) -> NativeSensor {
        NativeSensor::new(Arc::new(FakePlatform {
            accel,
            light,
            broken_light: false,
        }))
    }

    #[test]
    fn movement_threshold_boundaries() {
        assert!(!is_native_moving([0.0, 1.0, 0.0]));
        assert!(!is_native_moving([1.1, 0.0, 0.0]));
        assert!(is_native_moving([1.1001, 0.0, 0.0]));
        assert!(!is_native_moving([0.0, 0.0, 0.9]));
        assert!(is_native_moving([0.0, 0.0, 0.8999]));
        assert!(is_native_moving([0.0, 0.0, 0.0]));
    }

    #[test]
    fn magnitude_uses_all_three_components() {
        // 0.6² + 0.8² = 1.0, so at rest even though no single axis reads 1 g.
        assert!(!is_native_moving([0.6, 0.8, 0.0]));
        assert!(is_native_moving([0.6, 0.8, 0.6]));
    }

    #[test]
    fn no_reading_before_start_or_after_stop() {
        let mut native = sensor(Some([0.0, 1.0, 0.0]), Some(40.0));
        assert!(native.get_reading().is_none());

        native.start().unwrap();
        let reading = native.get_reading().unwrap();
        assert_eq!(reading.acceleration(), [0.0, 1.0, 0.0]);
        assert_eq!(reading.light_level, 40.0);
        assert!(!reading.is_moving);

        native.stop();
        native.stop();
        assert!(native.get_reading().is_none());
        assert!(!native.has_accelerometer());
    }

    #[test]
    fn missing_light_sensor_reports_zero() {
        let mut native = sensor(Some([0.0, 1.5, 0.0]), None);
        native.start().unwrap();
        assert!(native.has_accelerometer());
        assert!(!native.has_light_sensor());

        for _ in 0..10 {
            let reading = native.get_reading().unwrap();
            assert_eq!(reading.light_level, 0.0);
            assert!(reading.is_moving);
        }
    }

    #[test]
    fn missing_accelerometer_reports_zero_vector() {
        let mut native = sensor(None, Some(250.0));
        native.start().unwrap();
        let reading = native.get_reading().unwrap();
        assert_eq!(reading.acceleration(), [0.0; 3]);
        assert_eq!(reading.light_level, 250.0);
    }

    #[test]
    fn failing_light_read_falls_back_to_zero() {
        let mut native = NativeSensor::new(Arc::new(FakePlatform {
            accel: Some([0.0, 1.0, 0.0]),
            light: None,
            broken_light: true,
        }));
        native.start().unwrap();
        assert_eq!(native.get_reading().unwrap().light_level, 0.0);
    }

    #[test]
    fn light_is_clamped() {
        let mut native = sensor(None, Some(50_000.0));
        native.start().unwrap();
        assert_eq!(native.get_reading().unwrap().light_level, 2000.0);
    }
}
