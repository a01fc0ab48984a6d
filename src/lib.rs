//! Liquid Cooling Monitor
//!
//! Closed-loop temperature control for a custom liquid-cooling loop: reads CPU,
//! GPU, coolant and motherboard temperatures, smooths them, maps them through
//! piecewise-linear curves and drives radiator fans, a motherboard fan and the
//! pump on Aquacomputer Quadro / D5 Next controllers.

pub mod actuators;
pub mod args;
pub mod config;
pub mod control;
pub mod curve;
pub mod devices;
pub mod diagnostics;
pub mod errors;
pub mod logging;
pub mod sensors;
pub mod shutdown;
pub mod smoothing;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/liquidctl-monitor/config.json";
pub const DEFAULT_LOG_DIR: &str = "/var/log/liquidctl-monitor";

// Re-export commonly used types
pub use config::MonitorConfig;
pub use control::ControlLoop;
pub use curve::{interpolate, CurveProfile, DutyPercent};
pub use devices::{Channel, ControllerDevice, Hardware, StatusEntry};
pub use errors::{MonitorError, Result};
pub use sensors::{Readings, SensorClass, SystemSensors, Temperature};
