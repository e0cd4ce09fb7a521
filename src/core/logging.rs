//! Logging initialization
//!
//! Console + file logging via `simplelog`. The file path and level come from
//! validated [`Settings`]; a file that cannot be created is a startup fault.

use std::fs::File;

use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

use crate::core::config::{ConfigError, Settings};

/// Initialize the logger for both console and file output.
pub fn init_logger(settings: &Settings) -> Result<(), ConfigError> {
    let log_file = File::create(&settings.log_file_path).map_err(|e| ConfigError::LogFile {
        path: settings.log_file_path.clone(),
        source: e,
    })?;

    CombinedLogger::init(vec![
        TermLogger::new(
            settings.log_level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(settings.log_level, Config::default(), log_file),
    ])
    .map_err(|e| ConfigError::Logger(e.to_string()))?;

    Ok(())
}
