//! Dashboard configuration.
//!
//! Loaded from a TOML file and then overridden by environment variables.
//! Every section is optional; a missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::DEFAULT_TIMEOUT;
use crate::locations::default_config_path;
use crate::news::NewsCategory;
use crate::stopwatch::DEFAULT_SAMPLE_INTERVAL;
use crate::weather::Location;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default)]
    pub stopwatch: StopwatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsConfig {
    pub api_key: Option<String>,

    #[serde(default)]
    pub category: NewsCategory,
}

/// Stopwatch sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopwatchConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for StopwatchConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL.as_millis() as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// `--config`, then `$DESKBOARD_CONFIG`, then the default location.
    /// An explicitly named file must exist; the default one may not.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("DESKBOARD_CONFIG").map(PathBuf::from))
            .filter(|path| !path.as_os_str().is_empty());

        let mut config = match explicit {
            Some(path) => {
                let config = Self::load(&path)?;
                info!(path = %path.display(), "loaded config");
                config
            }
            None => {
                let path = default_config_path();
                if path.exists() {
                    match Self::load(&path) {
                        Ok(config) => {
                            info!(path = %path.display(), "loaded config");
                            config
                        }
                        Err(err) => {
                            warn!(error = %err, "ignoring unreadable default config");
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("DESKBOARD_NEWS_API_KEY") {
            self.news.api_key = Some(key);
        }
        if let Some(category) = lookup("DESKBOARD_NEWS_CATEGORY") {
            match serde_json::from_value(serde_json::Value::String(category.to_lowercase())) {
                Ok(category) => self.news.category = category,
                Err(_) => warn!(%category, "ignoring unknown news category override"),
            }
        }
        if let Some(latitude) = lookup("DESKBOARD_LATITUDE").and_then(|raw| raw.parse().ok()) {
            self.weather.latitude = Some(latitude);
        }
        if let Some(longitude) = lookup("DESKBOARD_LONGITUDE").and_then(|raw| raw.parse().ok()) {
            self.weather.longitude = Some(longitude);
        }
        if let Some(level) = lookup("DESKBOARD_LOG") {
            self.logging.level = level;
        }
    }

    /// `None` when no location is configured at all.
    pub fn location(&self) -> Option<Result<Location, String>> {
        match (self.weather.latitude, self.weather.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location::new(latitude, longitude)),
            (None, None) => None,
            _ => Some(Err("both latitude and longitude are required".to_string())),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.stopwatch.sample_interval_ms.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_secs.max(1))
    }
}

pub fn generate_default_config() -> String {
    r#"# deskboard configuration
#
# Environment variables override these settings:
# - DESKBOARD_NEWS_API_KEY
# - DESKBOARD_NEWS_CATEGORY
# - DESKBOARD_LATITUDE
# - DESKBOARD_LONGITUDE
# - DESKBOARD_LOG

[weather]
# Location for current conditions (Open-Meteo). Leave unset to hide weather.
# latitude = 52.52
# longitude = 13.405

# Request timeout in seconds, shared with the news feed
timeout_secs = 10

[news]
# Free key from https://newsapi.org/register
# api_key = "YOUR_NEWS_API_KEY"

# business, entertainment, general, health, science, sports, technology
category = "general"

[stopwatch]
# How often the running stopwatch is re-sampled (ms)
sample_interval_ms = 10

[logging]
# trace, debug, info, warn, error (or a full filter such as "deskboard=debug")
level = "info"

# Log file; defaults to deskboard.log in the state directory
# file = "/tmp/deskboard.log"
"#
    .to_string()
}
