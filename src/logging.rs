//! Logging setup for the monitor

use fern::Dispatch;
use log::LevelFilter;
use std::fs;
use std::path::Path;

/// Name of the log file inside the log directory
pub const LOG_FILE_NAME: &str = "monitor.log";

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Setup logging to stdout and, when `log_dir` is given, to `monitor.log` in it.
///
/// The directory is created if needed; failing to create it is an error.
pub fn setup(verbosity: u8, log_dir: Option<&Path>) -> Result<(), fern::InitError> {
    let mut dispatch = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(level_for(verbosity))
        .chain(std::io::stdout());

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        dispatch = dispatch.chain(fern::log_file(dir.join(LOG_FILE_NAME))?);
    }

    dispatch.apply()?;
    Ok(())
}
