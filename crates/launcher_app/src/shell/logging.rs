//! Logger initialization for the shell.
//!
//! Writes to `<state_dir>/launcher.log` unless configured otherwise. The
//! terminal is shared with the command prompt, so file output is the default.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use super::config::{LogConfig, LogDestination};

const LOG_FILENAME: &str = "launcher.log";

pub fn initialize(settings: &LogConfig, state_dir: &Path) {
    let level = settings.level_filter();
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match settings.destination {
        LogDestination::File => match create_file_logger(level, config, state_dir) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config, state_dir) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    state_dir: &Path,
) -> Option<Box<WriteLogger<File>>> {
    let log_path = state_dir.join(LOG_FILENAME);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", log_path, err);
            None
        }
    }
}
