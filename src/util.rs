//! Utility module, a grab-bag of functionality

use chrono::Utc;
use fern;
use log;
use std::io;

/// Map a `-v` count to a log level. No flag means info.
pub fn verbosity_level(verbose: u64) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Parse a `LOG_LEVEL` style name.
///
/// `fatal` has no counterpart in `log` and maps to error.
pub fn parse_level(name: &str) -> Option<log::LevelFilter> {
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(log::LevelFilter::Trace),
        "debug" | "d" => Some(log::LevelFilter::Debug),
        "info" | "i" => Some(log::LevelFilter::Info),
        "warn" | "warning" | "w" => Some(log::LevelFilter::Warn),
        "error" | "e" | "fatal" => Some(log::LevelFilter::Error),
        _ => None,
    }
}

/// Pick the log level: the environment name if set and non-empty, the `-v`
/// count otherwise.
pub fn log_level(verbose: u64, env_level: Option<&str>) -> Result<log::LevelFilter, String> {
    match env_level.filter(|name| !name.trim().is_empty()) {
        None => Ok(verbosity_level(verbose)),
        Some(name) => parse_level(name).ok_or_else(|| format!("unknown log level {:?}", name)),
    }
}

/// Install the process logger.
///
/// May only be called once per process.
pub fn setup_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.module_path().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()
}
