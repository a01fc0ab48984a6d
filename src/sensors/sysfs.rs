//! hwmon chips and thermal zones under sysfs

use crate::errors::{MonitorError, Result};
use crate::sensors::Temperature;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a sysfs attribute and strip the trailing newline.
pub fn read_trimmed(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Read a millidegree attribute and convert to degrees Celsius.
pub fn read_millidegrees(path: &Path) -> Result<Temperature> {
    let content = read_trimmed(path)?;
    let millidegrees: i64 = content.parse().map_err(|_| MonitorError::SensorParse {
        path: path.to_path_buf(),
        value: content.clone(),
    })?;
    Ok(millidegrees as f64 / 1000.0)
}

/// Extract `N` from names like `temp3_input` or `thermal_zone12`.
pub fn extract_index(name: &str, prefix: &str, suffix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()
}

/// A labelled temperature channel of a hwmon chip.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReading {
    pub index: u32,
    pub label: String,
    pub celsius: Temperature,
}

#[derive(Debug, Clone)]
pub struct HwmonChip {
    pub path: PathBuf,
    pub name: String,
}

impl HwmonChip {
    /// The `hwmonN` directory name.
    pub fn tag(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }

    /// All readable `tempN_input` channels, ordered by index.
    ///
    /// Channels without a `tempN_label` are labelled `tempN`.
    pub fn temperatures(&self) -> Vec<ChannelReading> {
        let mut readings = Vec::new();
        let Ok(entries) = fs::read_dir(&self.path) else {
            return readings;
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(index) = file_name
                .to_str()
                .and_then(|n| extract_index(n, "temp", "_input"))
            else {
                continue;
            };

            let Ok(celsius) = read_millidegrees(&entry.path()) else {
                continue;
            };
            let label = read_trimmed(&self.path.join(format!("temp{}_label", index)))
                .unwrap_or_else(|_| format!("temp{}", index));
            readings.push(ChannelReading {
                index,
                label,
                celsius,
            });
        }

        readings.sort_by_key(|r| r.index);
        readings
    }
}

/// List hwmon chips that expose a `name` attribute, ordered by directory name.
pub fn hwmon_chips(root: &Path) -> Result<Vec<HwmonChip>> {
    let mut chips = Vec::new();

    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Ok(name) = read_trimmed(&path.join("name")) {
            chips.push(HwmonChip { path, name });
        }
    }

    chips.sort_by_key(|c| extract_index(c.tag(), "hwmon", "").unwrap_or(u32::MAX));
    Ok(chips)
}

#[derive(Debug, Clone)]
pub struct ThermalZone {
    pub path: PathBuf,
    pub zone_type: String,
}

impl ThermalZone {
    pub fn temperature(&self) -> Result<Temperature> {
        read_millidegrees(&self.path.join("temp"))
    }

    /// Case-insensitive match of the zone type against any keyword.
    pub fn type_contains_any(&self, keywords: &[&str]) -> bool {
        let zone_type = self.zone_type.to_lowercase();
        keywords.iter().any(|k| zone_type.contains(k))
    }
}

/// List `thermal_zoneN` entries with a readable `type`, ordered by N.
pub fn thermal_zones(root: &Path) -> Result<Vec<ThermalZone>> {
    let mut zones = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(index) = file_name
            .to_str()
            .and_then(|n| extract_index(n, "thermal_zone", ""))
        else {
            continue;
        };
        let path = entry.path();
        if let Ok(zone_type) = read_trimmed(&path.join("type")) {
            zones.push((index, ThermalZone { path, zone_type }));
        }
    }

    zones.sort_by_key(|(index, _)| *index);
    Ok(zones.into_iter().map(|(_, zone)| zone).collect())
}
