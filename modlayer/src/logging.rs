//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to stderr and to a daily rotated
//! file in the configured log directory. `RUST_LOG` overrides the configured
//! level.

use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Prefix of the rotated log files.
pub const LOG_FILE_PREFIX: &str = "modlayer";

/// Errors setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Initialize logging for the process.
///
/// The returned guard flushes the file writer on drop and must be held
/// until exit.
pub fn init_logging(settings: &LoggingSettings, verbose: bool) -> Result<WorkerGuard, LoggingError> {
    let level = if verbose { "debug" } else { settings.level.as_str() };
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => build_filter(&env)?,
        _ => build_filter(level)?,
    };

    std::fs::create_dir_all(&settings.directory).map_err(|source| LoggingError::CreateDir {
        path: settings.directory.clone(),
        source,
    })?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&settings.directory)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let timer = local_timer();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(timer.clone())
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_timer(timer)
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        directory = %settings.directory.display(),
        level,
        "Logging initialized"
    );
    Ok(guard)
}

/// Parse a filter directive such as `info` or `modlayer=debug,warn`.
pub fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::Filter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Local-time RFC 3339 timestamps, UTC when the offset is unknown.
fn local_timer() -> OffsetTime<Rfc3339> {
    OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339))
}
