//! Log output setup.
//!
//! Events go to a daily rotating file in the configured directory and,
//! optionally, to the console. Both outputs are written from background
//! threads so the poll loop never waits on a slow disk or terminal.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "poolheat_service=info,poolheat_core=info,tower_http=info";

/// Base name of the log files.
pub const LOG_FILE_PREFIX: &str = "poolheatmetrics";

/// Number of daily files kept.
pub const MAX_LOG_FILES: usize = 30;

/// Handle to the installed logging stack.
///
/// Dropping it flushes and stops the background writers, so it must be held
/// until the process exits.
#[must_use = "dropping the handle stops logging"]
pub struct Logging {
    _guards: Vec<WorkerGuard>,
}

/// Errors raised while installing the logging stack.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
    #[error("Failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the daily rotating file appender for `directory`.
pub fn file_appender(directory: &Path) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(directory).map_err(|e| LoggingError::CreateDirectory {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(directory)?;

    Ok(appender)
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<Logging, LoggingError> {
    let appender = file_appender(&config.directory)?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
    let mut guards = vec![file_guard];

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console = if config.console {
        let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(stdout_guard);
        Some(fmt::layer().with_writer(stdout_writer).with_target(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;

    Ok(Logging { _guards: guards })
}
