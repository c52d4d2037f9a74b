//! Process configuration loaded once from a YAML file
//!
//! A [`ConfigCell`] guards the single load; the process-wide cell is reached
//! through [`process`]. Components receive the loaded [`Config`] by
//! reference at construction time instead of reading the global themselves.

use std::{fs, path::Path, sync::OnceLock};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

static PROCESS_CONFIG: ConfigCell = ConfigCell::new();

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: shown.clone(),
            message: err.to_string(),
        })?;

        let config = Self::from_yaml(&content).map_err(|err| ConfigError::Parse {
            path: shown.clone(),
            message: err.to_string(),
        })?;

        info!(path = %shown, "config file loaded");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

impl ServerConfig {
    /// Bind address in `host:port` form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Write-once slot for a [`Config`].
///
/// The first caller of [`ConfigCell::load`] runs the loader; concurrent
/// callers block until it finishes and every caller, then and later, sees
/// the same cached outcome. A failed load is cached too and is never retried.
#[derive(Debug)]
pub struct ConfigCell {
    slot: OnceLock<Result<Config, ConfigError>>,
}

impl ConfigCell {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<&Config, ConfigError> {
        self.load_with(|| Config::from_file(path))
    }

    pub fn load_with<F>(&self, loader: F) -> Result<&Config, ConfigError>
    where
        F: FnOnce() -> Result<Config, ConfigError>,
    {
        self.slot.get_or_init(loader).as_ref().map_err(Clone::clone)
    }

    /// Returns the loaded config.
    ///
    /// # Panics
    ///
    /// Panics when no load has succeeded; there is no safe default for bind
    /// parameters.
    pub fn get(&self) -> &Config {
        match self.slot.get() {
            Some(Ok(config)) => config,
            _ => panic!("config not loaded, call load() first"),
        }
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide config slot. Only its first `load` reads a file.
pub fn process() -> &'static ConfigCell {
    &PROCESS_CONFIG
}
