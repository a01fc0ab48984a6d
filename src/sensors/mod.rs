//! Temperature acquisition for the four sensor classes
//!
//! Every reader returns a [`Result`]; a class that simply has nothing to
//! report this cycle yields [`MonitorError::SensorUnavailable`], anything
//! else is a fault. The control loop turns both into an absent reading.

pub mod coolant;
pub mod cpu;
pub mod gpu;
pub mod motherboard;
pub mod sysfs;

use crate::devices::Hardware;
use crate::errors::{MonitorError, Result};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Degrees Celsius.
pub type Temperature = f64;

/// Readings outside this band are discarded as implausible.
pub const PLAUSIBLE_RANGE: RangeInclusive<Temperature> = 20.0..=100.0;

pub fn is_plausible(temperature: Temperature) -> bool {
    PLAUSIBLE_RANGE.contains(&temperature)
}

/// Largest plausible value, if any.
pub fn max_plausible(values: impl IntoIterator<Item = Temperature>) -> Option<Temperature> {
    values.into_iter().filter(|t| is_plausible(*t)).reduce(f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorClass {
    Cpu,
    Gpu,
    Coolant,
    Motherboard,
}

impl SensorClass {
    pub const ALL: [SensorClass; 4] = [
        SensorClass::Cpu,
        SensorClass::Gpu,
        SensorClass::Coolant,
        SensorClass::Motherboard,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorClass::Cpu => "cpu",
            SensorClass::Gpu => "gpu",
            SensorClass::Coolant => "coolant",
            SensorClass::Motherboard => "motherboard",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            SensorClass::Cpu => 0,
            SensorClass::Gpu => 1,
            SensorClass::Coolant => 2,
            SensorClass::Motherboard => 3,
        }
    }
}

impl fmt::Display for SensorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the filesystem and command-line sensor sources live.
#[derive(Debug, Clone)]
pub struct SystemSensors {
    pub hwmon_root: PathBuf,
    pub thermal_root: PathBuf,
    pub sensors_program: String,
    pub sensors_args: Vec<String>,
}

impl Default for SystemSensors {
    fn default() -> Self {
        Self {
            hwmon_root: PathBuf::from("/sys/class/hwmon"),
            thermal_root: PathBuf::from("/sys/class/thermal"),
            sensors_program: "sensors".to_string(),
            sensors_args: vec!["-A".to_string()],
        }
    }
}

/// One value per sensor class; `None` when the class produced nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub cpu: Option<Temperature>,
    pub gpu: Option<Temperature>,
    pub coolant: Option<Temperature>,
    pub motherboard: Option<Temperature>,
}

impl Readings {
    pub fn get(&self, class: SensorClass) -> Option<Temperature> {
        match class {
            SensorClass::Cpu => self.cpu,
            SensorClass::Gpu => self.gpu,
            SensorClass::Coolant => self.coolant,
            SensorClass::Motherboard => self.motherboard,
        }
    }

    pub fn set(&mut self, class: SensorClass, value: Option<Temperature>) {
        let slot = match class {
            SensorClass::Cpu => &mut self.cpu,
            SensorClass::Gpu => &mut self.gpu,
            SensorClass::Coolant => &mut self.coolant,
            SensorClass::Motherboard => &mut self.motherboard,
        };
        *slot = value;
    }
}

struct Celsius(Option<Temperature>);

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{:.1}°C", t),
            None => f.write_str("N/A"),
        }
    }
}

impl fmt::Display for Readings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU: {}, GPU: {}, Coolant: {}, MB: {}",
            Celsius(self.cpu),
            Celsius(self.gpu),
            Celsius(self.coolant),
            Celsius(self.motherboard)
        )
    }
}

/// Read one sensor class from the collaborators owned by `hardware`.
pub async fn read(class: SensorClass, hardware: &mut Hardware) -> Result<Temperature> {
    match class {
        SensorClass::Cpu => cpu::read(&hardware.system).map(|(temp, _)| temp),
        SensorClass::Gpu => match hardware.gpu.as_deref() {
            Some(gpu) => gpu.temperature(),
            None => Err(MonitorError::unavailable(class, "no GPU telemetry handle")),
        },
        SensorClass::Coolant => match hardware.pump_controller.as_deref_mut() {
            Some(device) => coolant::read(device),
            None => Err(MonitorError::unavailable(class, "no pump controller")),
        },
        SensorClass::Motherboard => motherboard::read(&hardware.system).await,
    }
}
