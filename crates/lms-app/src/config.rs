//! RON configuration for the `lms` binary.
//!
//! Looked up at `$XDG_CONFIG_HOME/lms/config.ron` unless `--config` is
//! given. A missing file means defaults; a malformed one is an error.
//!
//! ```ron
//! (
//!     data_dir: Some("/srv/lms"),
//!     log_filter: Some("lms_client=debug,info"),
//!     log_file: None,
//!     rollback_failed_signup: true,
//! )
//! ```

use std::path::{Path, PathBuf};

use lms_client::SessionConfig;
use lms_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the database and images live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub log_filter: Option<String>,
    /// Also log to this file, rolled daily.
    pub log_file: Option<PathBuf>,
    /// Remove an account whose role record could not be written at sign-up.
    pub rollback_failed_signup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_filter: None,
            log_file: None,
            rollback_failed_signup: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Ron {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lms").join("config.ron"))
    }

    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Load from `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_ron(&text).map_err(|source| ConfigError::Ron {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lms")
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            rollback_failed_signup: self.rollback_failed_signup,
            ..SessionConfig::default()
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log_filter.clone(),
            file: self.log_file.clone(),
        }
    }
}
