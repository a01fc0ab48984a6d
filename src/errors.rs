//! Error types for the liquid monitor

use crate::sensors::SensorClass;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the liquid monitor
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the liquid monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid curve profile: {len} values, expected an even count of at least 4")]
    InvalidProfile { len: usize },

    #[error("{class} sensor unavailable: {reason}")]
    SensorUnavailable { class: SensorClass, reason: String },

    #[error("Unparseable sensor value {value:?} in {}", path.display())]
    SensorParse { path: PathBuf, value: String },

    #[error("Sensor utility failed: {0}")]
    SensorCommand(String),

    #[error("GPU telemetry error: {0}")]
    Gpu(#[from] nvml_wrapper::error::NvmlError),

    #[error("Device {device} not connected")]
    DeviceNotConnected { device: String },

    #[error("Command to {device} failed: {reason}")]
    DeviceCommand { device: String, reason: String },

    #[error("Unexpected fault in control loop: {0}")]
    LoopFault(String),
}

impl MonitorError {
    /// Shorthand for a reading that simply does not exist this cycle.
    pub fn unavailable(class: SensorClass, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable {
            class,
            reason: reason.into(),
        }
    }

    /// True for "nothing to read" as opposed to a sensor that faulted.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::SensorUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_distinguished_from_faults() {
        let missing = MonitorError::unavailable(SensorClass::Gpu, "no NVML handle");
        assert!(missing.is_unavailable());
        assert_eq!(missing.to_string(), "gpu sensor unavailable: no NVML handle");

        let fault = MonitorError::SensorCommand("exit status 1".to_string());
        assert!(!fault.is_unavailable());
    }

    #[test]
    fn test_invalid_profile_message() {
        let err = MonitorError::InvalidProfile { len: 3 };
        assert!(err.to_string().contains("3 values"));
    }
}
