#![deny(missing_docs)]
//! Shared logging utilities for the launcher workspace.
//!
//! This crate provides the `launcher_*` logging macros used by the engine and
//! the application shell, plus a terminal logger initializer for tests.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! launcher_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! launcher_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! launcher_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! launcher_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! launcher_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Redacts a bearer credential for log output, keeping only a short prefix.
///
/// Access tokens must never reach the log file in full.
pub fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}… ({} chars)", token.chars().count())
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
