use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "logscope.log";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogTarget {
    /// The TUI owns the terminal, so only the file layer is installed.
    FileOnly,
    FileAndStderr,
}

#[derive(Debug, Error)]
pub enum InitLoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: String, source: io::Error },

    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Keeps the background log writer alive; drop it last to flush.
#[derive(Debug)]
pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub log_path: PathBuf,
}

pub fn init_logging(log_dir: &Path, target: LogTarget) -> Result<LoggingGuard, InitLoggingError> {
    fs::create_dir_all(log_dir).map_err(|error| InitLoggingError::CreateDir {
        path: log_dir.display().to_string(),
        source: error,
    })?;

    let file_appender = rolling::never(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|error| InitLoggingError::Filter(error.to_string()))?;

    let stderr_layer = match target {
        LogTarget::FileOnly => None,
        // Command output shares the terminal, so stderr only carries problems.
        LogTarget::FileAndStderr => Some(
            fmt::layer()
                .with_target(false)
                .with_writer(io::stderr)
                .with_filter(LevelFilter::WARN),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(|error| InitLoggingError::Install(error.to_string()))?;

    Ok(LoggingGuard {
        _guard: guard,
        log_path: log_dir.join(LOG_FILE_NAME),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_dir_and_reports_log_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_dir = dir.path().join("nested").join("logs");
        let guard = init_logging(&log_dir, LogTarget::FileOnly).expect("init logging");
        assert!(log_dir.is_dir());
        assert_eq!(guard.log_path, log_dir.join(LOG_FILE_NAME));
    }
}
