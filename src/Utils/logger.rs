use crate::errors::PlotError;
use chrono::Local;
use log::LevelFilter;
use simplelog::*;
use std::fs::File;

/// Maps the `loglevel` option to a level filter.
pub fn parse_loglevel(level: Option<&str>) -> Result<LevelFilter, PlotError> {
    match level.unwrap_or("info") {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(PlotError::Parse(format!(
            "loglevel must be debug, info, warn, error or off, got '{}'",
            other
        ))),
    }
}

/// name of the log file for a run started now
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Installs the global logger: terminal output, plus a timestamped file when `to_file` is set.
///
/// A logger that is already installed is left in place.
pub fn init_logger(level: LevelFilter, to_file: bool) -> Result<(), PlotError> {
    if level == LevelFilter::Off {
        return Ok(());
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if to_file {
        let file = File::create(log_file_name())?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    if CombinedLogger::init(loggers).is_err() {
        log::debug!("logger already initialised");
    }
    Ok(())
}
