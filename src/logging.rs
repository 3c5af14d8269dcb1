use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// The level comes from `RUST_LOG` and defaults to warnings;
/// `RUST_LOG=mbus_fields=trace` also dumps every telegram handed to the
/// decoder.
pub fn init_logger() {
    init_logger_with_default("warn");
}

/// Like [`init_logger`], but falls back to `default_filter` when `RUST_LOG`
/// is not set. Safe to call more than once.
pub fn init_logger_with_default(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
