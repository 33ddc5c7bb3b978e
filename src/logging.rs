//! Logging configuration and initialization.
//!
//! This module sets up the `tracing` subscriber, optionally directing logs
//! to daily files instead of stdout.

use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging based on the provided configuration.
///
/// If `log_to_file` is enabled, logs are written to daily files in
/// `log_dir`; otherwise they go to stdout.
///
/// Returns an optional `WorkerGuard` which MUST be held for the duration of
/// the program (assign it to a variable in `main`); dropping it early can
/// lose buffered log lines.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_to_file {
        let file_appender = rolling::daily(&config.log_dir, "cvrf-bulletin.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();

        Some(guard)
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();

        None
    }
}
