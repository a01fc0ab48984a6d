//! Motherboard / chipset temperature
//!
//! Primary source is the `sensors -A` report (network PHY/MAC and `temp1`
//! lines, hottest plausible value). The fallback takes the *first* plausible
//! chipset-like thermal zone rather than the hottest one.

use crate::errors::{MonitorError, Result};
use crate::sensors::sysfs;
use crate::sensors::{is_plausible, SensorClass, SystemSensors, Temperature};
use log::debug;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const SENSORS_TIMEOUT: Duration = Duration::from_secs(5);

const REPORT_LABELS: [&str; 3] = ["PHY Temperature:", "MAC Temperature:", "temp1:"];

const ZONE_KEYWORDS: [&str; 4] = ["chipset", "motherboard", "system", "pch"];

pub async fn read(system: &SystemSensors) -> Result<Temperature> {
    match run_sensors(system).await {
        Ok(report) => {
            if let Some(temp) = parse_report(&report).into_iter().reduce(f64::max) {
                return Ok(temp);
            }
            debug!("sensors report has no motherboard temperatures");
        }
        Err(e) => debug!("sensors report unavailable: {}", e),
    }

    first_chipset_zone(&system.thermal_root).ok_or_else(|| {
        MonitorError::unavailable(
            SensorClass::Motherboard,
            "no sensors report value or chipset thermal zone",
        )
    })
}

async fn run_sensors(system: &SystemSensors) -> Result<String> {
    let mut command = Command::new(&system.sensors_program);
    command.args(&system.sensors_args).kill_on_drop(true);

    let output = timeout(SENSORS_TIMEOUT, command.output())
        .await
        .map_err(|_| {
            MonitorError::SensorCommand(format!(
                "{} timed out after {:?}",
                system.sensors_program, SENSORS_TIMEOUT
            ))
        })??;

    if !output.status.success() {
        return Err(MonitorError::SensorCommand(format!(
            "{} exited with {}",
            system.sensors_program, output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Plausible values from PHY/MAC/`temp1` lines of a `sensors` report,
/// at most one per line.
pub fn parse_report(report: &str) -> Vec<Temperature> {
    report
        .lines()
        .filter(|line| REPORT_LABELS.iter().any(|l| line.contains(l)))
        .filter_map(parse_line)
        .collect()
}

/// `"PHY Temperature:  +57.8°C"` -> 57.8, scanning right to left before the unit.
fn parse_line(line: &str) -> Option<Temperature> {
    let (before_unit, _) = line.split_once("°C")?;
    before_unit
        .split_whitespace()
        .rev()
        .filter_map(|part| part.replace(['+', '*'], "").parse::<f64>().ok())
        .find(|t| is_plausible(*t))
}

fn first_chipset_zone(thermal_root: &Path) -> Option<Temperature> {
    let zones = sysfs::thermal_zones(thermal_root).ok()?;
    zones
        .iter()
        .filter(|z| z.type_contains_any(&ZONE_KEYWORDS))
        .filter_map(|z| z.temperature().ok())
        .find(|t| is_plausible(*t))
}
