use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "deskboard.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log filter `{filter}`: {error}")]
    Filter { filter: String, error: String },
    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Routes `tracing` output to a plain-text file. The terminal belongs to the
/// dashboard, so nothing is written to stdout or stderr.
pub fn init_logging(config: &LoggingConfig, state_dir: &Path) -> Result<PathBuf, LoggingError> {
    let path = config
        .file
        .clone()
        .unwrap_or_else(|| state_dir.join(LOG_FILE_NAME));
    let filter = build_filter(&config.level)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| LoggingError::Io {
                path: path.clone(),
                source,
            })?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::Io {
            path: path.clone(),
            source,
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))?;

    Ok(path)
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level.trim()).map_err(|err| LoggingError::Filter {
        filter: level.to_string(),
        error: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn accepts_levels_and_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("deskboard=debug,reqwest=warn").is_ok());
        assert!(build_filter("deskboard=notalevel").is_err());
    }
}
