//! Main entry point for the liquid cooling monitor

use anyhow::Context;
use clap::Parser;
use liquid_monitor::{
    args::Args, logging, shutdown, ControlLoop, Hardware, MonitorConfig, SystemSensors,
};
use log::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Print version and build metadata for binary identity verification
    let pkg_version = env!("CARGO_PKG_VERSION");
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let git_desc = option_env!("GIT_DESC").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    eprintln!(
        "liquid-monitor v{} (git {} / {}) built {}",
        pkg_version, git_hash, git_desc, build_time
    );

    let args = Args::parse();

    logging::setup(args.verbose, Some(&args.log_dir))
        .with_context(|| format!("failed to set up logging in {}", args.log_dir.display()))?;

    let config = MonitorConfig::load_or_create(&args.config)
        .with_context(|| format!("failed to prepare config {}", args.config.display()))?;
    info!("Configuration loaded from {}", args.config.display());

    let hardware = Hardware::connect(&config.hardware, SystemSensors::default());
    let mut monitor = ControlLoop::new(config, hardware);
    monitor.run(shutdown::listen()).await;

    Ok(())
}
