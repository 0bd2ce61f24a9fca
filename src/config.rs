//! Runtime configuration at ~/.geofix/config.json.
//!
//! Precedence, highest first: command-line flags, environment
//! (`GEOFIX_API_KEY`, `GEOFIX_TIMEOUT_SECS`), the config file, defaults.
//! A missing file is not an error; a broken one is.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::location::LocationError;

pub const ENV_API_KEY: &str = "GEOFIX_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "GEOFIX_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,
    /// 0 disables the timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            host: default_host(),
            port: DEFAULT_PORT,
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".geofix")
            .join("config.json")
    }

    /// Read a config file, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, LocationError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(LocationError::Configuration(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&data).map_err(|e| {
            LocationError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Apply environment variables read through `var`.
    pub fn apply_env<F>(mut self, var: F) -> Result<Self, LocationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(raw) = var(ENV_TIMEOUT_SECS) {
            self.timeout_secs = raw.trim().parse().map_err(|_| {
                LocationError::Configuration(format!("{} must be whole seconds, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
        }
        Ok(self)
    }

    pub fn apply_overrides(mut self, o: Overrides) -> Self {
        if let Some(key) = o.api_key {
            self.api_key = Some(key);
        }
        if let Some(t) = o.timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(h) = o.host {
            self.host = h;
        }
        if let Some(p) = o.port {
            self.port = p;
        }
        self
    }

    /// File (given or default path), then process environment, then `overrides`.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self, LocationError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        Ok(Self::load_from(&path)?
            .apply_env(|k| std::env::var(k).ok())?
            .apply_overrides(overrides))
    }

    pub fn api_key(&self) -> Result<&str, LocationError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LocationError::Configuration(format!(
                    "no API key; pass --key, set {} or add \"api_key\" to {}",
                    ENV_API_KEY,
                    Self::default_path().display()
                ))
            })
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
