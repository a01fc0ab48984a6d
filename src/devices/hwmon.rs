//! Aquacomputer Quadro / D5 Next controllers through the `aquacomputer_d5next`
//! hwmon driver

use crate::curve::DutyPercent;
use crate::devices::{Channel, ControllerDevice, StatusEntry};
use crate::errors::{MonitorError, Result};
use crate::sensors::coolant::CELSIUS_UNIT;
use crate::sensors::sysfs::{self, HwmonChip};
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// PWM duty cycle range (0-255 for standard Linux hwmon)
pub const PWM_MAX: f64 = 255.0;

/// `pwmN_enable` value selecting manual control
const MANUAL_MODE: &str = "1";

/// Selector value that accepts any matching chip
pub const AUTO_SELECTOR: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerModel {
    /// Four fan channels, drives the radiator pair and the motherboard fan
    Quadro,
    /// Pump on `pwm1`, one fan header on `pwm2`, reports coolant temperature
    D5Next,
}

impl ControllerModel {
    pub fn from_chip_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("quadro") {
            Some(ControllerModel::Quadro)
        } else if name.contains("d5") {
            Some(ControllerModel::D5Next)
        } else {
            None
        }
    }

    /// hwmon `pwmN` index driving a channel.
    pub fn pwm_index(&self, channel: Channel) -> Option<u8> {
        match (self, channel) {
            (ControllerModel::Quadro, Channel::Fan(n)) if (1..=4).contains(&n) => Some(n),
            (ControllerModel::D5Next, Channel::Pump) => Some(1),
            (ControllerModel::D5Next, Channel::Fan(1)) => Some(2),
            _ => None,
        }
    }
}

/// Convert a duty percentage to a raw PWM value.
pub fn duty_to_pwm(duty: DutyPercent) -> u8 {
    ((duty.min(100) as f64 / 100.0) * PWM_MAX) as u8
}

/// "Coolant temp" -> "Coolant temperature"
fn temperature_key(label: &str) -> String {
    let base = label.strip_suffix(" temp").unwrap_or(label);
    if base.to_lowercase().contains("temperature") {
        base.to_string()
    } else {
        format!("{} temperature", base)
    }
}

/// One controller, addressed through its hwmon directory
pub struct HwmonController {
    chip: HwmonChip,
    model: ControllerModel,
    description: String,
    overridden: HashSet<u8>,
    connected: bool,
}

impl HwmonController {
    /// Open the controller behind a hwmon directory.
    pub fn open(path: &Path) -> Result<Self> {
        let name = sysfs::read_trimmed(&path.join("name"))?;
        let chip = HwmonChip {
            path: path.to_path_buf(),
            name,
        };
        Self::from_chip(chip)
    }

    fn from_chip(chip: HwmonChip) -> Result<Self> {
        let model = ControllerModel::from_chip_name(&chip.name).ok_or_else(|| {
            MonitorError::Config(format!(
                "{} ({}) is not a Quadro or D5 Next",
                chip.name,
                chip.path.display()
            ))
        })?;
        let description = format!("{} at {}", chip.name, chip.path.display());

        Ok(Self {
            chip,
            model,
            description,
            overridden: HashSet::new(),
            connected: true,
        })
    }

    pub fn model(&self) -> ControllerModel {
        self.model
    }

    pub fn path(&self) -> &Path {
        &self.chip.path
    }

    fn pwm_path(&self, index: u8) -> PathBuf {
        self.chip.path.join(format!("pwm{}", index))
    }

    fn command_error(&self, reason: impl Into<String>) -> MonitorError {
        MonitorError::DeviceCommand {
            device: self.description.clone(),
            reason: reason.into(),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(MonitorError::DeviceNotConnected {
                device: self.description.clone(),
            })
        }
    }

    /// Switch a channel to manual control so our writes are not overridden by
    /// the controller's own curve.
    fn enter_direct_mode(&mut self, index: u8) -> Result<()> {
        if self.overridden.contains(&index) {
            return Ok(());
        }
        let enable_path = self.chip.path.join(format!("pwm{}_enable", index));
        if enable_path.exists() {
            fs::write(&enable_path, MANUAL_MODE)
                .map_err(|e| self.command_error(format!("{}: {}", enable_path.display(), e)))?;
        }
        self.overridden.insert(index);
        Ok(())
    }

    fn fan_status(&self) -> Vec<StatusEntry> {
        let mut status = Vec::new();
        for index in 1..=4u8 {
            let input = self.chip.path.join(format!("fan{}_input", index));
            let Ok(rpm) = sysfs::read_trimmed(&input) else {
                continue;
            };
            let Ok(rpm) = rpm.parse::<f64>() else {
                continue;
            };
            let label = sysfs::read_trimmed(&self.chip.path.join(format!("fan{}_label", index)))
                .unwrap_or_else(|_| format!("Fan {}", index));
            let base = label.strip_suffix(" speed").unwrap_or(&label);
            status.push(StatusEntry::new(format!("{} speed", base), rpm, "rpm"));

            if let Ok(pwm) = sysfs::read_trimmed(&self.pwm_path(index)) {
                if let Ok(pwm) = pwm.parse::<f64>() {
                    let percent = (pwm / PWM_MAX * 100.0).round();
                    status.push(StatusEntry::new(format!("{} duty", base), percent, "%"));
                }
            }
        }
        status
    }
}

impl ControllerDevice for HwmonController {
    fn description(&self) -> &str {
        &self.description
    }

    fn status(&mut self) -> Result<Vec<StatusEntry>> {
        self.ensure_connected()?;

        let mut status: Vec<StatusEntry> = self
            .chip
            .temperatures()
            .into_iter()
            .map(|r| StatusEntry::new(temperature_key(&r.label), r.celsius, CELSIUS_UNIT))
            .collect();
        status.extend(self.fan_status());
        Ok(status)
    }

    fn set_fixed_speed(&mut self, channel: Channel, duty: DutyPercent) -> Result<()> {
        self.ensure_connected()?;

        let index = self
            .model
            .pwm_index(channel)
            .ok_or_else(|| self.command_error(format!("no {} channel", channel)))?;
        self.enter_direct_mode(index)?;

        let pwm = duty_to_pwm(duty);
        let pwm_path = self.pwm_path(index);
        fs::write(&pwm_path, pwm.to_string())
            .map_err(|e| self.command_error(format!("{}: {}", pwm_path.display(), e)))?;

        debug!("Set {} {} to PWM {} ({}%)", self.description, channel, pwm, duty);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.connected = false;
        debug!("Disconnected {}", self.description);
        Ok(())
    }
}

/// Controllers found by [`discover`]
#[derive(Default)]
pub struct Discovered {
    pub fan_controller: Option<HwmonController>,
    pub pump_controller: Option<HwmonController>,
}

/// `auto`, the `hwmonN` directory name, its full path, or the chip name.
fn selector_matches(selector: &str, chip: &HwmonChip) -> bool {
    selector.eq_ignore_ascii_case(AUTO_SELECTOR)
        || chip.tag() == selector
        || chip.path == Path::new(selector)
        || chip.name == selector
}

/// Scan a hwmon root for the Quadro (fan controller) and D5 Next (pump
/// controller). The first chip matching each selector wins.
pub fn discover(root: &Path, quadro_selector: &str, d5_selector: &str) -> Result<Discovered> {
    let mut found = Discovered::default();

    for chip in sysfs::hwmon_chips(root)? {
        let Some(model) = ControllerModel::from_chip_name(&chip.name) else {
            continue;
        };
        let (slot, selector) = match model {
            ControllerModel::Quadro => (&mut found.fan_controller, quadro_selector),
            ControllerModel::D5Next => (&mut found.pump_controller, d5_selector),
        };
        if slot.is_some() || !selector_matches(selector, &chip) {
            debug!("Skipping {} at {}", chip.name, chip.path.display());
            continue;
        }
        *slot = Some(HwmonController::from_chip(chip)?);
    }

    Ok(found)
}
