use crate::devices::{ControllerDevice, StatusEntry};
use crate::errors::{MonitorError, Result};
use crate::sensors::{SensorClass, Temperature};

pub const CELSIUS_UNIT: &str = "°C";

/// First status entry that looks like a temperature in °C.
pub fn find_coolant(status: &[StatusEntry]) -> Option<Temperature> {
    status
        .iter()
        .find(|e| e.key.to_lowercase().contains("temperature") && e.unit == CELSIUS_UNIT)
        .map(|e| e.value)
}

/// Coolant temperature from the pump controller's status report.
pub fn read(device: &mut dyn ControllerDevice) -> Result<Temperature> {
    let status = device.status()?;
    find_coolant(&status).ok_or_else(|| {
        MonitorError::unavailable(
            SensorClass::Coolant,
            format!("no temperature in {} status", device.description()),
        )
    })
}
