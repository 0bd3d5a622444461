//! Logging setup for ssed
//!
//! Diagnostics go to stderr so they never mix with transformed output on
//! stdout. The filter comes from `SSED_LOG` when set (standard `EnvFilter`
//! syntax, e.g. `SSED_LOG=ssed=trace`), otherwise from `--verbose` or the
//! configured level. With `logging.debug = true` the same events are also
//! appended to ~/.ssed/ssed.log through a non-blocking writer.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

use crate::config::{self, LoggingConfig};

pub const LOG_ENV_VAR: &str = "SSED_LOG";
const LOG_FILE_NAME: &str = "ssed.log";

/// Keeps the file writer alive; logs are flushed when this is dropped
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
    pub log_path: Option<PathBuf>,
}

/// Filter directive used when `SSED_LOG` is not set
pub fn default_directive(logging: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    format!("ssed={level}")
}

fn build_filter(logging: &LoggingConfig, verbose: bool) -> EnvFilter {
    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_directive(logging, verbose)),
    }
}

/// Initialize the global subscriber
pub fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<LogGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, file_guard, log_path) = if logging.debug {
        match open_log_file() {
            Ok((writer, guard, path)) => {
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_thread_ids(true);
                (Some(layer), Some(guard), Some(path))
            }
            Err(e) => {
                // File logging is optional; carry on with stderr only
                eprintln!("Warning: Could not open log file: {e:#}");
                (None, None, None)
            }
        }
    } else {
        (None, None, None)
    };

    let subscriber = registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(build_filter(logging, verbose));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_path,
    })
}

fn open_log_file() -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard, PathBuf)> {
    let dir = config::config_dir()?;
    let path = ensure_log_dir(&dir)?;
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((writer, guard, path))
}

fn ensure_log_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    Ok(dir.join(LOG_FILE_NAME))
}

/// Where the debug log is written when enabled
pub fn log_file_path() -> Result<PathBuf> {
    Ok(config::config_dir()?.join(LOG_FILE_NAME))
}
