use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

// =============================================================================
// Defaults and limits
// =============================================================================

/// Default cache freshness window in hours
pub const DEFAULT_CACHE_PERIOD_HOURS: i64 = 8;

/// Largest accepted cache freshness window in hours; anything outside
/// 1..=MAX falls back to the default
pub const MAX_CACHE_PERIOD_HOURS: i64 = 150;

/// Default timeout for fetch operations in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Resolver configuration, read from a TOML file and overridable through
/// the `CACHE_PERIOD_HOURS`, `FETCH_TIMEOUT_SECS` and `DATA_DIR`
/// environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// How long cached records stay fresh, in hours
    pub cache_period_hours: i64,
    /// Timeout applied to upstream fetches, in seconds
    pub fetch_timeout_secs: u64,
    /// Where the cache database and log file live; `{HOME}` expands to the
    /// user's home directory
    pub data_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_period_hours: DEFAULT_CACHE_PERIOD_HOURS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Loads configuration from `path` when given, then applies environment
    /// overrides. Without a path the defaults are used as the base.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_env_overrides(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = env("CACHE_PERIOD_HOURS") {
            match raw.parse() {
                Ok(hours) => self.cache_period_hours = hours,
                Err(_) => warn!("ignoring CACHE_PERIOD_HOURS: '{}' is not an integer", raw),
            }
        }

        if let Some(raw) = env("FETCH_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => self.fetch_timeout_secs = secs,
                Err(_) => warn!("ignoring FETCH_TIMEOUT_SECS: '{}' is not an integer", raw),
            }
        }

        if let Some(dir) = env("DATA_DIR") {
            self.data_dir = Some(dir);
        }

        self
    }

    /// Returns the data directory.
    /// Uses the configured `data_dir` (with `{HOME}` expanded) when present.
    /// Otherwise uses $XDG_DATA_HOME/release-resolver if XDG_DATA_HOME is set,
    /// falls back to ~/.local/share/release-resolver,
    /// or ./release-resolver if neither is available.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => expand_home(dir, dirs::home_dir()),
            None => data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir()),
        }
    }

    /// Creates the data directory if needed and returns its path.
    pub fn ensure_data_dir(&self) -> std::io::Result<PathBuf> {
        let dir = self.data_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Returns the path to the cache database file.
    pub fn cache_db_path(&self) -> PathBuf {
        self.data_dir().join("cache.db")
    }
}

fn expand_home(dir: &str, home_dir: Option<PathBuf>) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("{HOME}") {
        if let Some(home) = home_dir {
            return home.join(rest.trim_start_matches('/'));
        }
        warn!("no home directory found, leaving '{}' unexpanded", dir);
    }

    PathBuf::from(dir)
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("release-resolver")
}
