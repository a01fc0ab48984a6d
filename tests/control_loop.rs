use liquid_monitor::actuators::Actuator;
use liquid_monitor::control::{ControlLoop, LoopState, RECOVERY_INTERVAL};
use liquid_monitor::errors::{MonitorError, Result};
use liquid_monitor::sensors::gpu::GpuTelemetry;
use liquid_monitor::{
    Channel, ControllerDevice, CurveProfile, DutyPercent, Hardware, MonitorConfig, SensorClass,
    StatusEntry, SystemSensors, Temperature,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Default)]
struct DeviceLog {
    commands: Vec<(Channel, DutyPercent)>,
    disconnects: u32,
}

struct FakeController {
    name: &'static str,
    log: Rc<RefCell<DeviceLog>>,
    status: Vec<StatusEntry>,
    fail_commands: bool,
}

impl FakeController {
    fn new(name: &'static str, log: &Rc<RefCell<DeviceLog>>) -> Self {
        Self {
            name,
            log: log.clone(),
            status: Vec::new(),
            fail_commands: false,
        }
    }

    fn with_coolant(mut self, celsius: f64) -> Self {
        self.status.push(StatusEntry::new("Pump speed", 2400.0, "rpm"));
        self.status.push(StatusEntry::new("Liquid temperature", celsius, "°C"));
        self
    }

    fn failing(mut self) -> Self {
        self.fail_commands = true;
        self
    }
}

impl ControllerDevice for FakeController {
    fn description(&self) -> &str {
        self.name
    }

    fn status(&mut self) -> Result<Vec<StatusEntry>> {
        Ok(self.status.clone())
    }

    fn set_fixed_speed(&mut self, channel: Channel, duty: DutyPercent) -> Result<()> {
        if self.fail_commands {
            return Err(MonitorError::DeviceCommand {
                device: self.name.to_string(),
                reason: "usb write failed".to_string(),
            });
        }
        self.log.borrow_mut().commands.push((channel, duty));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.log.borrow_mut().disconnects += 1;
        Ok(())
    }
}

enum GpuBehaviour {
    Reads(Temperature),
    Fails,
    Panics,
}

struct FakeGpu {
    behaviour: GpuBehaviour,
    shutdowns: Rc<Cell<u32>>,
}

impl GpuTelemetry for FakeGpu {
    fn temperature(&self) -> Result<Temperature> {
        match self.behaviour {
            GpuBehaviour::Reads(temp) => Ok(temp),
            GpuBehaviour::Fails => Err(MonitorError::SensorCommand("driver went away".to_string())),
            GpuBehaviour::Panics => panic!("nvml handle poisoned"),
        }
    }

    fn shutdown(self: Box<Self>) -> Result<()> {
        self.shutdowns.set(self.shutdowns.get() + 1);
        Ok(())
    }
}

/// Fake sysfs: a k10temp die at `cpu` °C and, optionally, a pch zone.
fn system(dir: &TempDir, cpu: Option<i64>, chipset: Option<i64>) -> SystemSensors {
    let hwmon_root = dir.path().join("hwmon");
    let thermal_root = dir.path().join("thermal");
    fs::create_dir_all(&hwmon_root).unwrap();
    fs::create_dir_all(&thermal_root).unwrap();

    if let Some(millidegrees) = cpu {
        let chip = hwmon_root.join("hwmon0");
        fs::create_dir_all(&chip).unwrap();
        write(&chip, "name", "k10temp");
        write(&chip, "temp1_label", "Tctl");
        write(&chip, "temp1_input", "99000");
        write(&chip, "temp3_label", "Tccd1");
        write(&chip, "temp3_input", &millidegrees.to_string());
    }
    if let Some(millidegrees) = chipset {
        let zone = thermal_root.join("thermal_zone2");
        fs::create_dir_all(&zone).unwrap();
        write(&zone, "type", "pch_cannonlake");
        write(&zone, "temp", &millidegrees.to_string());
    }

    SystemSensors {
        hwmon_root,
        thermal_root,
        sensors_program: "liquid-monitor-no-such-sensors-binary".to_string(),
        sensors_args: Vec::new(),
    }
}

fn write(dir: &Path, file: &str, contents: &str) {
    fs::write(dir.join(file), format!("{}\n", contents)).unwrap();
}

fn config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.pump_curve.profile =
        CurveProfile::new(vec![30.0, 5.0, 40.0, 25.0, 50.0, 60.0, 60.0, 85.0, 70.0, 100.0]);
    config
}

fn gpu(behaviour: GpuBehaviour, shutdowns: &Rc<Cell<u32>>) -> Box<FakeGpu> {
    Box::new(FakeGpu {
        behaviour,
        shutdowns: shutdowns.clone(),
    })
}

#[tokio::test]
async fn test_full_iteration_drives_every_actuator() {
    let dir = TempDir::new().unwrap();
    let quadro = Rc::new(RefCell::new(DeviceLog::default()));
    let d5 = Rc::new(RefCell::new(DeviceLog::default()));
    let shutdowns = Rc::new(Cell::new(0));

    let hardware = Hardware::new(system(&dir, Some(70_000), Some(45_000)))
        .with_fan_controller(Box::new(FakeController::new("quadro", &quadro)))
        .with_pump_controller(Box::new(FakeController::new("d5next", &d5).with_coolant(32.0)))
        .with_gpu(gpu(GpuBehaviour::Reads(60.0), &shutdowns));
    let mut monitor = ControlLoop::new(config(), hardware);

    let report = monitor.step().await.unwrap();

    assert_eq!(report.readings.cpu, Some(70.0));
    assert_eq!(report.readings.gpu, Some(60.0));
    assert_eq!(report.readings.coolant, Some(32.0));
    assert_eq!(report.readings.motherboard, Some(45.0));

    let summary: Vec<_> = report
        .actuations
        .iter()
        .map(|a| (a.actuator, a.duty, a.applied))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Actuator::RadiatorFans, 48, true),
            (Actuator::MotherboardFan, 60, true),
            (Actuator::Pump, 100, true),
        ]
    );

    assert_eq!(
        quadro.borrow().commands,
        vec![(Channel::Fan(1), 48), (Channel::Fan(2), 48), (Channel::Fan(3), 60)]
    );
    assert_eq!(d5.borrow().commands, vec![(Channel::Pump, 100)]);
}

#[tokio::test]
async fn test_only_coolant_drives_only_radiator() {
    let dir = TempDir::new().unwrap();
    let quadro = Rc::new(RefCell::new(DeviceLog::default()));
    let d5 = Rc::new(RefCell::new(DeviceLog::default()));

    let hardware = Hardware::new(system(&dir, None, None))
        .with_fan_controller(Box::new(FakeController::new("quadro", &quadro)))
        .with_pump_controller(Box::new(FakeController::new("d5next", &d5).with_coolant(40.0)));
    let mut monitor = ControlLoop::new(config(), hardware);

    let report = monitor.step().await.unwrap();

    assert_eq!(report.actuations.len(), 1);
    assert_eq!(report.actuations[0].actuator, Actuator::RadiatorFans);
    assert_eq!(report.actuations[0].duty, 80);
    assert_eq!(
        quadro.borrow().commands,
        vec![(Channel::Fan(1), 80), (Channel::Fan(2), 80)]
    );
    assert!(d5.borrow().commands.is_empty());
}

#[tokio::test]
async fn test_failed_gpu_read_skips_pump_and_keeps_history() {
    let dir = TempDir::new().unwrap();
    let quadro = Rc::new(RefCell::new(DeviceLog::default()));
    let d5 = Rc::new(RefCell::new(DeviceLog::default()));
    let shutdowns = Rc::new(Cell::new(0));

    let hardware = Hardware::new(system(&dir, Some(70_000), Some(45_000)))
        .with_fan_controller(Box::new(FakeController::new("quadro", &quadro)))
        .with_pump_controller(Box::new(FakeController::new("d5next", &d5).with_coolant(32.0)))
        .with_gpu(gpu(GpuBehaviour::Fails, &shutdowns));
    let mut monitor = ControlLoop::new(config(), hardware);

    let report = monitor.step().await.unwrap();

    assert_eq!(report.readings.gpu, None);
    assert!(monitor.filter().history(SensorClass::Gpu).is_empty());
    assert_eq!(monitor.filter().history(SensorClass::Cpu).len(), 1);
    assert!(report.actuations.iter().all(|a| a.actuator != Actuator::Pump));
    assert_eq!(report.actuations.len(), 2);
    assert!(d5.borrow().commands.is_empty());
}

#[tokio::test]
async fn test_command_failure_does_not_stop_other_actuators() {
    let dir = TempDir::new().unwrap();
    let quadro = Rc::new(RefCell::new(DeviceLog::default()));
    let d5 = Rc::new(RefCell::new(DeviceLog::default()));
    let shutdowns = Rc::new(Cell::new(0));

    let hardware = Hardware::new(system(&dir, Some(70_000), Some(45_000)))
        .with_fan_controller(Box::new(FakeController::new("quadro", &quadro).failing()))
        .with_pump_controller(Box::new(FakeController::new("d5next", &d5).with_coolant(32.0)))
        .with_gpu(gpu(GpuBehaviour::Reads(60.0), &shutdowns));
    let mut monitor = ControlLoop::new(config(), hardware);

    let report = monitor.step().await.unwrap();

    let applied: Vec<_> = report
        .actuations
        .iter()
        .map(|a| (a.actuator, a.applied))
        .collect();
    assert_eq!(
        applied,
        vec![
            (Actuator::RadiatorFans, false),
            (Actuator::MotherboardFan, false),
            (Actuator::Pump, true),
        ]
    );
    assert_eq!(d5.borrow().commands, vec![(Channel::Pump, 100)]);
}

#[tokio::test]
async fn test_panic_in_iteration_becomes_loop_fault() {
    let dir = TempDir::new().unwrap();
    let shutdowns = Rc::new(Cell::new(0));

    let hardware = Hardware::new(system(&dir, Some(70_000), None))
        .with_gpu(gpu(GpuBehaviour::Panics, &shutdowns));
    let mut monitor = ControlLoop::new(config(), hardware);

    match monitor.step().await {
        Err(MonitorError::LoopFault(message)) => assert!(message.contains("poisoned")),
        other => panic!("expected a loop fault, got {:?}", other.map(|r| r.actuations.len())),
    }
    assert_eq!(monitor.state(), LoopState::Running);
}

#[tokio::test]
async fn test_shutdown_releases_hardware_once() {
    let dir = TempDir::new().unwrap();
    let quadro = Rc::new(RefCell::new(DeviceLog::default()));
    let d5 = Rc::new(RefCell::new(DeviceLog::default()));
    let shutdowns = Rc::new(Cell::new(0));

    let hardware = Hardware::new(system(&dir, Some(70_000), Some(45_000)))
        .with_fan_controller(Box::new(FakeController::new("quadro", &quadro)))
        .with_pump_controller(Box::new(FakeController::new("d5next", &d5).with_coolant(32.0)))
        .with_gpu(gpu(GpuBehaviour::Reads(60.0), &shutdowns));
    let mut config = config();
    config.monitoring.interval = 0.05;
    let mut monitor = ControlLoop::new(config, hardware);

    let (tx, rx) = watch::channel(false);
    let stop = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(true).unwrap();
    };
    tokio::join!(monitor.run(rx), stop);

    assert_eq!(monitor.state(), LoopState::Stopping);
    assert!(!quadro.borrow().commands.is_empty());
    assert_eq!(quadro.borrow().disconnects, 1);
    assert_eq!(d5.borrow().disconnects, 1);
    assert_eq!(shutdowns.get(), 1);

    monitor.shutdown();
    drop(monitor);
    assert_eq!(quadro.borrow().disconnects, 1);
    assert_eq!(d5.borrow().disconnects, 1);
    assert_eq!(shutdowns.get(), 1);
}

/// Panics on every read and records when each iteration asked for it.
struct FaultingGpu {
    calls: Rc<RefCell<Vec<Instant>>>,
}

impl GpuTelemetry for FaultingGpu {
    fn temperature(&self) -> Result<Temperature> {
        self.calls.borrow_mut().push(Instant::now());
        panic!("nvml handle poisoned");
    }

    fn shutdown(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_faulted_iteration_waits_recovery_interval() {
    let dir = TempDir::new().unwrap();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let hardware = Hardware::new(system(&dir, None, None)).with_gpu(Box::new(FaultingGpu {
        calls: calls.clone(),
    }));
    let mut config = config();
    config.monitoring.interval = 0.05;
    let mut monitor = ControlLoop::new(config, hardware);

    let (tx, rx) = watch::channel(false);
    let stop = async {
        tokio::time::sleep(Duration::from_secs(7)).await;
        tx.send(true).unwrap();
    };
    tokio::join!(monitor.run(rx), stop);

    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert!(calls[1] - calls[0] >= RECOVERY_INTERVAL);
    assert_eq!(monitor.state(), LoopState::Stopping);
}
