//! Tracing setup for the library client.
//!
//! Builds one subscriber: an [`EnvFilter`], a human-readable layer on
//! stderr, and optionally a daily-rolling log file written off-thread.
//! `log` records (the session actor logs through `log`) are bridged into the
//! same subscriber.
//!
//! # Filter precedence
//!
//! 1. `RUST_LOG`, when set
//! 2. the configured filter
//! 3. `info`
//!
//! ```no_run
//! let guard = lms_telemetry::init("lms", &lms_telemetry::LogConfig::default())?;
//! // keep `guard` alive until exit so the file writer flushes
//! # Ok::<(), lms_telemetry::TelemetryError>(())
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "info";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `lms_client=debug,info`.
    pub filter: Option<String>,
    /// Log file path. The file rolls daily: `lms.log` becomes `lms.log.2026-10-16`.
    pub file: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter {directives:?}: {message}")]
    InvalidFilter { directives: String, message: String },

    #[error("log file path has no file name: {0}")]
    LogPath(PathBuf),

    #[error("cannot create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Keeps the background log writer alive. Drop it last.
#[must_use = "dropping the guard stops file logging"]
pub struct TelemetryGuard {
    _worker: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl TelemetryGuard {
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Pick the filter directives to use.
pub fn filter_directives(env: Option<String>, configured: Option<&str>) -> String {
    env.filter(|s| !s.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Split a log file path into the directory and file-name prefix the
/// rolling appender wants.
fn split_log_path(path: &Path) -> Result<(PathBuf, String), TelemetryError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TelemetryError::LogPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_string()))
}

/// Install the global subscriber.
pub fn init(service: &str, config: &LogConfig) -> Result<TelemetryGuard, TelemetryError> {
    let directives = filter_directives(std::env::var("RUST_LOG").ok(), config.filter.as_deref());
    let filter = EnvFilter::try_new(&directives).map_err(|e| TelemetryError::InvalidFilter {
        directives: directives.clone(),
        message: e.to_string(),
    })?;

    let (file_layer, worker) = match &config.file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir).map_err(|source| TelemetryError::LogDir {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(service, filter = %directives, "tracing initialized");
    Ok(TelemetryGuard {
        _worker: worker,
        log_file: config.file.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(
            filter_directives(Some("debug".into()), Some("warn")),
            "debug"
        );
        assert_eq!(filter_directives(None, Some("warn")), "warn");
        assert_eq!(filter_directives(Some("  ".into()), None), DEFAULT_FILTER);
        assert_eq!(filter_directives(None, None), "info");
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/lms/lms.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/lms"));
        assert_eq!(name, "lms.log");

        let (dir, name) = split_log_path(Path::new("lms.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "lms.log");

        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(TelemetryError::LogPath(_))
        ));
    }

    #[test]
    fn test_init_with_file_then_reinit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            filter: Some("lms=debug,info".into()),
            file: Some(dir.path().join("logs/lms.log")),
        };
        let guard = init("lms-test", &config).unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert_eq!(guard.log_file(), config.file.as_deref());

        assert!(matches!(
            init("lms-test", &LogConfig::default()),
            Err(TelemetryError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_bad_filter_is_reported() {
        let config = LogConfig {
            filter: Some("lms=notalevel".into()),
            file: None,
        };
        // RUST_LOG would take precedence; only meaningful when unset.
        if std::env::var("RUST_LOG").is_err() {
            assert!(matches!(
                init("lms-test", &config),
                Err(TelemetryError::InvalidFilter { .. })
            ));
        }
    }
}
