use crate::errors::{MonitorError, Result};
use crate::sensors::sysfs::{self, HwmonChip};
use crate::sensors::{max_plausible, SensorClass, SystemSensors, Temperature};
use log::debug;
use std::fmt;
use std::path::Path;

/// hwmon drivers exposing per-CCD die temperatures on AMD parts
const DIE_CHIPS: [&str; 2] = ["k10temp", "zenpower"];

/// Die temperature labels. `Tctl` is left out: it carries a fixed platform
/// offset on several parts.
const DIE_LABEL_PREFIXES: [&str; 2] = ["Tccd", "Tdie"];

const ZONE_KEYWORDS: [&str; 2] = ["cpu", "core"];

/// Intel's per-core driver
const CORETEMP_CHIP: &str = "coretemp";

/// Which path produced the CPU temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuSource {
    DieChannels,
    ThermalZones,
    Coretemp,
}

impl fmt::Display for CpuSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuSource::DieChannels => write!(f, "die channels"),
            CpuSource::ThermalZones => write!(f, "thermal zones"),
            CpuSource::Coretemp => write!(f, "coretemp"),
        }
    }
}

/// Read the hottest plausible CPU temperature.
///
/// Tries die channels first, then `cpu`/`core` thermal zones, then the
/// coretemp chip. Every path takes the maximum of its plausible values.
pub fn read(system: &SystemSensors) -> Result<(Temperature, CpuSource)> {
    let chips = sysfs::hwmon_chips(&system.hwmon_root).unwrap_or_else(|e| {
        debug!("No hwmon chips under {}: {}", system.hwmon_root.display(), e);
        Vec::new()
    });

    if let Some(temp) = die_temperature(&chips) {
        return Ok((temp, CpuSource::DieChannels));
    }
    if let Some(temp) = thermal_zone_temperature(&system.thermal_root) {
        return Ok((temp, CpuSource::ThermalZones));
    }
    if let Some(temp) = coretemp_temperature(&chips) {
        return Ok((temp, CpuSource::Coretemp));
    }

    Err(MonitorError::unavailable(
        SensorClass::Cpu,
        "no die channel, thermal zone or coretemp reading",
    ))
}

fn is_die_label(label: &str) -> bool {
    DIE_LABEL_PREFIXES.iter().any(|p| label.starts_with(p))
}

fn die_temperature(chips: &[HwmonChip]) -> Option<Temperature> {
    let values = chips
        .iter()
        .filter(|c| DIE_CHIPS.contains(&c.name.as_str()))
        .flat_map(|c| c.temperatures())
        .filter(|r| is_die_label(&r.label))
        .map(|r| r.celsius);
    max_plausible(values)
}

fn thermal_zone_temperature(thermal_root: &Path) -> Option<Temperature> {
    let zones = sysfs::thermal_zones(thermal_root).ok()?;
    let values = zones
        .iter()
        .filter(|z| z.type_contains_any(&ZONE_KEYWORDS))
        .filter_map(|z| z.temperature().ok());
    max_plausible(values)
}

fn coretemp_temperature(chips: &[HwmonChip]) -> Option<Temperature> {
    let values = chips
        .iter()
        .filter(|c| c.name == CORETEMP_CHIP)
        .flat_map(|c| c.temperatures())
        .map(|r| r.celsius);
    max_plausible(values)
}
