//! Physical controllers and the hardware handles owned by the control loop

pub mod hwmon;

use crate::config::HardwareConfig;
use crate::curve::DutyPercent;
use crate::errors::Result;
use crate::sensors::gpu::{GpuTelemetry, NvmlTelemetry};
use crate::sensors::SystemSensors;
use log::{error, info, warn};
use std::fmt;

/// Output channel on a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Fan(u8),
    Pump,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Fan(n) => write!(f, "fan{}", n),
            Channel::Pump => write!(f, "pump"),
        }
    }
}

/// One `(key, value, unit)` line of a controller status report.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub key: String,
    pub value: f64,
    pub unit: String,
}

impl StatusEntry {
    pub fn new(key: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value,
            unit: unit.into(),
        }
    }
}

/// Command transport to one physical fan/pump controller.
///
/// Speed commands are direct overrides: the controller's own automatic curve
/// is bypassed while the monitor runs.
pub trait ControllerDevice {
    fn description(&self) -> &str;

    fn status(&mut self) -> Result<Vec<StatusEntry>>;

    fn set_fixed_speed(&mut self, channel: Channel, duty: DutyPercent) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}

/// Every external handle the control loop talks to.
///
/// At most one handle exists per physical device, and [`Hardware::release`]
/// gives each of them up exactly once.
pub struct Hardware {
    pub(crate) fan_controller: Option<Box<dyn ControllerDevice>>,
    pub(crate) pump_controller: Option<Box<dyn ControllerDevice>>,
    pub(crate) gpu: Option<Box<dyn GpuTelemetry>>,
    pub(crate) system: SystemSensors,
}

impl Hardware {
    /// No controllers, no GPU: only the filesystem sensors.
    pub fn new(system: SystemSensors) -> Self {
        Self {
            fan_controller: None,
            pump_controller: None,
            gpu: None,
            system,
        }
    }

    pub fn with_fan_controller(mut self, device: Box<dyn ControllerDevice>) -> Self {
        self.fan_controller = Some(device);
        self
    }

    pub fn with_pump_controller(mut self, device: Box<dyn ControllerDevice>) -> Self {
        self.pump_controller = Some(device);
        self
    }

    pub fn with_gpu(mut self, gpu: Box<dyn GpuTelemetry>) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Open the NVML handle and the Quadro / D5 Next controllers.
    ///
    /// Nothing here is fatal; whatever cannot be opened is logged and left out.
    pub fn connect(config: &HardwareConfig, system: SystemSensors) -> Self {
        let mut hardware = Self::new(system);

        match NvmlTelemetry::connect() {
            Ok(gpu) => {
                info!("NVIDIA GPU monitoring initialized: {}", gpu.name());
                hardware.gpu = Some(Box::new(gpu));
            }
            Err(e) => error!("Failed to initialize NVIDIA monitoring: {}", e),
        }

        match hwmon::discover(
            &hardware.system.hwmon_root,
            &config.quadro_device,
            &config.d5_device,
        ) {
            Ok(found) => {
                if let Some(quadro) = found.fan_controller {
                    info!("Quadro device found: {}", quadro.description());
                    hardware.fan_controller = Some(Box::new(quadro));
                }
                if let Some(d5) = found.pump_controller {
                    info!("D5 Next device found: {}", d5.description());
                    hardware.pump_controller = Some(Box::new(d5));
                }
                if !hardware.has_fan_controller() && !hardware.has_pump_controller() {
                    error!("No supported devices found (Quadro or D5 Next)");
                }
            }
            Err(e) => error!("Failed to scan for controllers: {}", e),
        }

        hardware
    }

    pub fn has_fan_controller(&self) -> bool {
        self.fan_controller.is_some()
    }

    pub fn has_pump_controller(&self) -> bool {
        self.pump_controller.is_some()
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn system(&self) -> &SystemSensors {
        &self.system
    }

    pub(crate) fn fan_controller_mut(&mut self) -> Option<&mut dyn ControllerDevice> {
        self.fan_controller
            .as_deref_mut()
            .map(|d| d as &mut dyn ControllerDevice)
    }

    pub(crate) fn pump_controller_mut(&mut self) -> Option<&mut dyn ControllerDevice> {
        self.pump_controller
            .as_deref_mut()
            .map(|d| d as &mut dyn ControllerDevice)
    }

    /// Shut down NVML and disconnect both controllers.
    ///
    /// Each release is attempted on its own; failures are logged and do not
    /// stop the others. Handles are taken, so a second call does nothing.
    pub fn release(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            if let Err(e) = gpu.shutdown() {
                warn!("Failed to shut down NVML: {}", e);
            }
        }

        for (role, device) in [
            ("fan controller", self.fan_controller.take()),
            ("pump controller", self.pump_controller.take()),
        ] {
            if let Some(mut device) = device {
                if let Err(e) = device.disconnect() {
                    warn!("Failed to disconnect {} {}: {}", role, device.description(), e);
                }
            }
        }
    }
}
