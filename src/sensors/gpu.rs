//! NVIDIA GPU die temperature through NVML

use crate::errors::Result;
use crate::sensors::Temperature;
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;

/// Vendor telemetry handle, created once at startup.
pub trait GpuTelemetry {
    /// Current GPU die temperature.
    fn temperature(&self) -> Result<Temperature>;

    /// Release the handle. Called at most once, during shutdown.
    fn shutdown(self: Box<Self>) -> Result<()>;
}

/// NVML session bound to one device index.
pub struct NvmlTelemetry {
    nvml: Nvml,
    index: u32,
    name: String,
}

impl NvmlTelemetry {
    /// Initialize NVML and check that device 0 answers.
    pub fn connect() -> Result<Self> {
        Self::connect_index(0)
    }

    pub fn connect_index(index: u32) -> Result<Self> {
        let nvml = Nvml::init()?;
        let name = {
            let device = nvml.device_by_index(index)?;
            device.name().unwrap_or_else(|_| format!("GPU {}", index))
        };
        Ok(Self { nvml, index, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl GpuTelemetry for NvmlTelemetry {
    fn temperature(&self) -> Result<Temperature> {
        let device = self.nvml.device_by_index(self.index)?;
        let celsius = device.temperature(TemperatureSensor::Gpu)?;
        Ok(Temperature::from(celsius))
    }

    fn shutdown(self: Box<Self>) -> Result<()> {
        self.nvml.shutdown()?;
        Ok(())
    }
}
