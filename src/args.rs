//! Command line argument parsing for the monitor and the hardware test

use crate::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR};
use clap::Parser;
use std::path::PathBuf;

/// Liquid cooling monitor
///
/// Reads CPU, GPU, coolant and motherboard temperatures and drives the
/// radiator fans, motherboard fan and pump from configurable curves.
#[derive(Parser, Debug)]
#[command(name = "liquid-monitor")]
#[command(about = "Temperature-driven fan and pump control")]
#[command(version)]
pub struct Args {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file, created with defaults if missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Directory for monitor.log
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,
}

/// Hardware test
///
/// Checks GPU, CPU and controller access once and exits non-zero if any
/// category fails.
#[derive(Parser, Debug)]
#[command(name = "hardware_test")]
#[command(about = "Check sensor and controller access")]
#[command(version)]
pub struct HardwareTestArgs {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file used for device selection; never created
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}
