//! One-shot hardware test: can we read every sensor and reach the controllers?

use crate::config::HardwareConfig;
use crate::devices::hwmon::{self, HwmonController};
use crate::devices::ControllerDevice;
use crate::sensors::gpu::{GpuTelemetry, NvmlTelemetry};
use crate::sensors::{cpu, SystemSensors};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Gpu,
    Cpu,
    Controllers,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Gpu => write!(f, "GPU"),
            Category::Cpu => write!(f, "CPU"),
            Category::Controllers => write!(f, "Controllers (Quadro/D5)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryResult {
    pub category: Category,
    pub passed: bool,
}

fn mark(passed: bool) -> &'static str {
    if passed {
        "✓"
    } else {
        "✗"
    }
}

pub fn check_gpu() -> CategoryResult {
    println!("Testing NVIDIA GPU...");
    let passed = match NvmlTelemetry::connect() {
        Ok(gpu) => {
            let passed = match gpu.temperature() {
                Ok(temp) => {
                    println!("✓ GPU Temperature ({}): {:.0}°C", gpu.name(), temp);
                    true
                }
                Err(e) => {
                    println!("✗ GPU Error: {}", e);
                    false
                }
            };
            if let Err(e) = Box::new(gpu).shutdown() {
                println!("  NVML shutdown failed: {}", e);
            }
            passed
        }
        Err(e) => {
            println!("✗ GPU Error: {}", e);
            false
        }
    };

    CategoryResult {
        category: Category::Gpu,
        passed,
    }
}

pub fn check_cpu(system: &SystemSensors) -> CategoryResult {
    println!("Testing CPU temperature...");
    let passed = match cpu::read(system) {
        Ok((temp, source)) => {
            println!("✓ CPU Temperature ({}): {:.1}°C", source, temp);
            true
        }
        Err(e) => {
            println!("✗ CPU Error: {}", e);
            false
        }
    };

    CategoryResult {
        category: Category::Cpu,
        passed,
    }
}

fn report_controller(role: &str, mut device: HwmonController) {
    println!("  - {}", device.description());
    println!("    → {} detected", role);

    match device.status() {
        Ok(status) => {
            println!("✓ {} status:", role);
            for entry in status {
                println!("  {}: {} {}", entry.key, entry.value, entry.unit);
            }
        }
        Err(e) => println!("    Error reading {} status: {}", role, e),
    }

    if let Err(e) = device.disconnect() {
        println!("    Error disconnecting {}: {}", role, e);
    }
}

/// Passes if either controller is found.
pub fn check_controllers(system: &SystemSensors, config: &HardwareConfig) -> CategoryResult {
    println!("Testing controllers...");
    let passed = match hwmon::discover(&system.hwmon_root, &config.quadro_device, &config.d5_device)
    {
        Ok(found) => {
            let quadro_found = found.fan_controller.is_some();
            let d5_found = found.pump_controller.is_some();

            if !quadro_found && !d5_found {
                println!("✗ No Aquacomputer devices found");
            }
            if let Some(quadro) = found.fan_controller {
                report_controller("Quadro fan controller", quadro);
            }
            if let Some(d5) = found.pump_controller {
                report_controller("D5 Next pump controller", d5);
            }
            quadro_found || d5_found
        }
        Err(e) => {
            println!("✗ Controller scan error: {}", e);
            false
        }
    };

    CategoryResult {
        category: Category::Controllers,
        passed,
    }
}

/// 0 if every category passed, 1 otherwise.
pub fn exit_code(results: &[CategoryResult]) -> i32 {
    if results.iter().all(|r| r.passed) {
        0
    } else {
        1
    }
}

pub fn print_summary(results: &[CategoryResult]) {
    println!();
    println!("{}", "=".repeat(50));
    println!("Test Results:");
    for result in results {
        println!("{}: {}", result.category, mark(result.passed));
    }

    if exit_code(results) == 0 {
        println!();
        println!("✓ All tests passed! Ready to install the service.");
        println!();
        println!("Hardware setup:");
        println!("  - Quadro: Controls fan1+fan2 (radiator) and fan3 (motherboard)");
        println!("  - D5 Next: Controls pump speed and provides coolant temperature");
    } else {
        println!();
        println!("✗ Some tests failed. Please check your hardware setup.");
    }
}

/// Run every category, print the summary and return the process exit code.
pub fn run(system: &SystemSensors, config: &HardwareConfig) -> i32 {
    println!("Liquid Cooling Monitor - Hardware Test");
    println!("{}", "=".repeat(50));

    let results = [
        check_gpu(),
        check_cpu(system),
        check_controllers(system, config),
    ];

    print_summary(&results);
    exit_code(&results)
}
