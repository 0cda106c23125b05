//! Logger setup shared by the CLI binary and embedding applications.
use chrono::Local;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

/// Maps a loglevel string to a filter. `None` means logging is switched off.
pub fn level_filter(loglevel: Option<&str>) -> Result<Option<LevelFilter>, String> {
    let filter = match loglevel {
        None => LevelFilter::Info,
        Some(level) => match level {
            "off" | "none" => return Ok(None),
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            other => {
                return Err(format!(
                    "loglevel must be debug, info, warn, error, off or none, got '{}'",
                    other
                ));
            }
        },
    };
    Ok(Some(filter))
}

/// Installs a terminal logger and, when `log_file` is set, a file logger writing to
/// `log_<date>_<time>.txt` in the working directory.
///
/// Returns `Ok(false)` when logging is disabled or a global logger was already installed.
pub fn init_logger(loglevel: Option<&str>, log_file: bool) -> Result<bool, String> {
    let Some(log_option) = level_filter(loglevel)? else {
        return Ok(false);
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if log_file {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        let file = File::create(&name).map_err(|e| format!("cannot create {}: {}", name, e))?;
        loggers.push(WriteLogger::new(log_option, Config::default(), file));
    }
    match CombinedLogger::init(loggers) {
        Ok(()) => {
            info!("Program started with loglevel: {}", log_option);
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}
