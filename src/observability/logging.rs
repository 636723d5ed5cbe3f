//! Structured logging.
//!
//! # Responsibilities
//! - Resolve the configured level name
//! - Install the global subscriber (stdout, or a daily-rotated file)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level when set
//! - File output goes through a non-blocking writer; its guard must outlive logging

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Errors raised while installing the log sink.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file path {} has no file name", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to open log file: {0}")]
    Appender(#[from] InitError),

    #[error("failed to install subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Keeps the file writer flushing for as long as it is held.
#[derive(Debug, Default)]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

impl LogGuard {
    /// Guard for a sink that needs no background flushing.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Resolve a level name. Returns `None` for unrecognized names.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "fatal" => Some(LevelFilter::ERROR),
        "off" | "none" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Install the global subscriber.
///
/// With a `file`, output is appended to `<file>.<date>` next to it and a new
/// file is started every day.
pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<LogGuard, LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match file {
        Some(path) => {
            let appender = daily_appender(path)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()?;

            Ok(LogGuard {
                _worker: Some(guard),
            })
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()?;

            Ok(LogGuard::none())
        }
    }
}

/// Build a daily-rotating appender for `path`.
pub fn daily_appender(path: &Path) -> Result<RollingFileAppender, LoggingError> {
    let (dir, prefix) = split_log_path(path)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .build(dir)?;
    Ok(appender)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String), LoggingError> {
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, prefix.to_string()))
}
