//! Monitor configuration
//!
//! JSON file with five sections. Missing keys at any depth take their
//! defaults; a missing file is created with full defaults; a broken file is
//! ignored (and left alone) in favour of in-memory defaults.

use crate::curve::CurveProfile;
use crate::errors::Result;
use crate::sensors::{SensorClass, Temperature};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Seconds between iterations
    pub interval: f64,
    pub history_size: usize,
    /// Weight of the newest reading, in (0, 1]
    pub smoothing_factor: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval: 2.0,
            history_size: 10,
            smoothing_factor: 0.2,
        }
    }
}

impl MonitoringConfig {
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval)
            .unwrap_or_else(|_| Duration::from_secs_f64(Self::default().interval))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanCurveConfig {
    /// Coolant temperature -> radiator fans (1+2)
    pub radiator_profile: CurveProfile,
    /// Network/chipset temperature -> motherboard fan (3)
    pub motherboard_profile: CurveProfile,
}

impl Default for FanCurveConfig {
    fn default() -> Self {
        Self {
            radiator_profile: CurveProfile::new(vec![
                20.0, 20.0, 30.0, 40.0, 35.0, 60.0, 40.0, 80.0, 45.0, 100.0,
            ]),
            motherboard_profile: CurveProfile::new(vec![
                30.0, 30.0, 40.0, 50.0, 50.0, 70.0, 60.0, 85.0, 70.0, 100.0,
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpCurveConfig {
    /// max(CPU, GPU) temperature -> pump
    pub profile: CurveProfile,
}

impl Default for PumpCurveConfig {
    fn default() -> Self {
        Self {
            profile: CurveProfile::new(vec![
                30.0, 30.0, 40.0, 50.0, 50.0, 70.0, 60.0, 85.0, 70.0, 100.0,
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// `"auto"` or a hwmon directory name / path / chip name
    pub quadro_device: String,
    pub d5_device: String,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            quadro_device: "auto".to_string(),
            d5_device: "auto".to_string(),
        }
    }
}

/// Informational ceilings; exceeding one only logs a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureLimits {
    pub cpu_max: Temperature,
    pub gpu_max: Temperature,
    pub coolant_max: Temperature,
    pub motherboard_max: Temperature,
}

impl Default for TemperatureLimits {
    fn default() -> Self {
        Self {
            cpu_max: 95.0,
            gpu_max: 90.0,
            coolant_max: 50.0,
            motherboard_max: 80.0,
        }
    }
}

impl TemperatureLimits {
    pub fn limit_for(&self, class: SensorClass) -> Temperature {
        match class {
            SensorClass::Cpu => self.cpu_max,
            SensorClass::Gpu => self.gpu_max,
            SensorClass::Coolant => self.coolant_max,
            SensorClass::Motherboard => self.motherboard_max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub monitoring: MonitoringConfig,
    pub fan_curve: FanCurveConfig,
    pub pump_curve: PumpCurveConfig,
    pub hardware: HardwareConfig,
    pub temperature_limits: TemperatureLimits,
}

impl MonitorConfig {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: MonitorConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Load the configuration, creating the file with defaults if it does not exist.
    ///
    /// Only a failure to create the config directory is returned as an error.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Ok(match Self::load_from_file(path) {
                Ok(config) => config.validated(),
                Err(e) => {
                    warn!("Error loading config {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config = Self::default();
        match config.save_to_file(path) {
            Ok(()) => info!("Created default configuration at {}", path.display()),
            Err(e) => warn!("Failed to write default config {}: {}", path.display(), e),
        }
        Ok(config)
    }

    /// Replace out-of-range monitoring values with their defaults and report
    /// malformed curve profiles.
    pub fn validated(mut self) -> Self {
        let defaults = MonitoringConfig::default();
        let monitoring = &mut self.monitoring;

        if !(monitoring.interval.is_finite() && monitoring.interval > 0.0) {
            warn!(
                "monitoring.interval {} is not a positive number of seconds, using {}",
                monitoring.interval, defaults.interval
            );
            monitoring.interval = defaults.interval;
        }
        if monitoring.history_size == 0 {
            warn!("monitoring.history_size must be at least 1, using {}", defaults.history_size);
            monitoring.history_size = defaults.history_size;
        }
        if !(monitoring.smoothing_factor > 0.0 && monitoring.smoothing_factor <= 1.0) {
            warn!(
                "monitoring.smoothing_factor {} is outside (0, 1], using {}",
                monitoring.smoothing_factor, defaults.smoothing_factor
            );
            monitoring.smoothing_factor = defaults.smoothing_factor;
        }

        for (name, profile) in [
            ("fan_curve.radiator_profile", &self.fan_curve.radiator_profile),
            ("fan_curve.motherboard_profile", &self.fan_curve.motherboard_profile),
            ("pump_curve.profile", &self.pump_curve.profile),
        ] {
            if let Err(e) = profile.validate() {
                error!("{}: {}", name, e);
            }
        }

        self
    }
}
