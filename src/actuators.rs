//! Speed commands for the three actuated devices

use crate::config::MonitorConfig;
use crate::curve::{CurveProfile, DutyPercent};
use crate::devices::{Channel, ControllerDevice, Hardware};
use crate::errors::{MonitorError, Result};
use crate::sensors::{Readings, Temperature};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

/// Gap kept between consecutive controller commands.
pub const COMMAND_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    /// Quadro fan1 + fan2, always at the same duty
    RadiatorFans,
    /// Quadro fan3
    MotherboardFan,
    /// D5 Next pump
    Pump,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [
        Actuator::RadiatorFans,
        Actuator::MotherboardFan,
        Actuator::Pump,
    ];

    pub fn curve_name(&self) -> &'static str {
        match self {
            Actuator::RadiatorFans => "radiator",
            Actuator::MotherboardFan => "motherboard",
            Actuator::Pump => "pump",
        }
    }

    /// Temperature driving this actuator, or `None` if an input is missing.
    ///
    /// The pump follows the hotter of CPU and GPU and needs both.
    pub fn demand(&self, readings: &Readings) -> Option<Temperature> {
        match self {
            Actuator::RadiatorFans => readings.coolant,
            Actuator::MotherboardFan => readings.motherboard,
            Actuator::Pump => match (readings.cpu, readings.gpu) {
                (Some(cpu), Some(gpu)) => Some(cpu.max(gpu)),
                _ => None,
            },
        }
    }

    pub fn profile<'a>(&self, config: &'a MonitorConfig) -> &'a CurveProfile {
        match self {
            Actuator::RadiatorFans => &config.fan_curve.radiator_profile,
            Actuator::MotherboardFan => &config.fan_curve.motherboard_profile,
            Actuator::Pump => &config.pump_curve.profile,
        }
    }

    pub fn is_connected(&self, hardware: &Hardware) -> bool {
        match self {
            Actuator::RadiatorFans | Actuator::MotherboardFan => hardware.has_fan_controller(),
            Actuator::Pump => hardware.has_pump_controller(),
        }
    }

    fn controller<'a>(&self, hardware: &'a mut Hardware) -> Result<&'a mut dyn ControllerDevice> {
        let device = match self {
            Actuator::RadiatorFans | Actuator::MotherboardFan => hardware.fan_controller_mut(),
            Actuator::Pump => hardware.pump_controller_mut(),
        };
        device.ok_or_else(|| MonitorError::DeviceNotConnected {
            device: self.to_string(),
        })
    }

    /// Command the actuator to `duty`, spacing commands by [`COMMAND_DELAY`].
    ///
    /// The radiator pair sends fan1, waits, then fan2; the other actuators
    /// wait before their single command.
    pub async fn set_speed(&self, duty: DutyPercent, hardware: &mut Hardware) -> Result<()> {
        let device = self.controller(hardware)?;

        match self {
            Actuator::RadiatorFans => {
                device.set_fixed_speed(Channel::Fan(1), duty)?;
                sleep(COMMAND_DELAY).await;
                device.set_fixed_speed(Channel::Fan(2), duty)?;
            }
            Actuator::MotherboardFan => {
                sleep(COMMAND_DELAY).await;
                device.set_fixed_speed(Channel::Fan(3), duty)?;
            }
            Actuator::Pump => {
                sleep(COMMAND_DELAY).await;
                device.set_fixed_speed(Channel::Pump, duty)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actuator::RadiatorFans => write!(f, "radiator fans (1+2)"),
            Actuator::MotherboardFan => write!(f, "motherboard fan (3)"),
            Actuator::Pump => write!(f, "pump"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::StatusEntry;
    use crate::sensors::SystemSensors;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Commands = Rc<RefCell<Vec<(Channel, DutyPercent)>>>;

    struct Recorder(Commands);

    impl ControllerDevice for Recorder {
        fn description(&self) -> &str {
            "recorder"
        }

        fn status(&mut self) -> Result<Vec<StatusEntry>> {
            Ok(Vec::new())
        }

        fn set_fixed_speed(&mut self, channel: Channel, duty: DutyPercent) -> Result<()> {
            self.0.borrow_mut().push((channel, duty));
            Ok(())
        }

        fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pump_demand_is_hotter_source_and_needs_both() {
        let mut readings = Readings {
            cpu: Some(70.0),
            gpu: Some(50.0),
            ..Readings::default()
        };
        assert_eq!(Actuator::Pump.demand(&readings), Some(70.0));

        readings.gpu = None;
        assert_eq!(Actuator::Pump.demand(&readings), None);
        assert_eq!(Actuator::RadiatorFans.demand(&readings), None);
    }

    #[tokio::test]
    async fn test_radiator_fans_move_together() {
        let commands = Commands::default();
        let mut hardware = Hardware::new(SystemSensors::default())
            .with_fan_controller(Box::new(Recorder(commands.clone())));

        Actuator::RadiatorFans.set_speed(64, &mut hardware).await.unwrap();
        Actuator::MotherboardFan.set_speed(30, &mut hardware).await.unwrap();

        assert_eq!(
            *commands.borrow(),
            vec![
                (Channel::Fan(1), 64),
                (Channel::Fan(2), 64),
                (Channel::Fan(3), 30)
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_controller_is_reported() {
        let mut hardware = Hardware::new(SystemSensors::default());
        assert!(!Actuator::Pump.is_connected(&hardware));
        assert!(matches!(
            Actuator::Pump.set_speed(50, &mut hardware).await,
            Err(MonitorError::DeviceNotConnected { .. })
        ));
    }
}
