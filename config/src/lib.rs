//! Configuration for Latchkey.
//!
//! Loaded from `$LATCHKEY_CONFIG` if set, otherwise `~/.latchkey/config.toml`.
//!
//! ```toml
//! [action]
//! use_internet = true
//! use_bluetooth = false
//!
//! [bridge]
//! stale_operation_secs = 300
//!
//! [log]
//! filter = "latchkey=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use latchkey_types::ActionOptions;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "LATCHKEY_CONFIG";

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LatchkeyConfig {
    #[serde(default)]
    pub action: ActionConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Defaults applied to every `action` request.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct ActionConfig {
    #[serde(default = "default_true")]
    pub request_bluetooth_permission: bool,
    #[serde(default = "default_true")]
    pub request_location_permission: bool,
    #[serde(default = "default_true")]
    pub use_internet: bool,
    #[serde(default = "default_true")]
    pub use_bluetooth: bool,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            request_bluetooth_permission: true,
            request_location_permission: true,
            use_internet: true,
            use_bluetooth: true,
        }
    }
}

impl From<ActionConfig> for ActionOptions {
    fn from(config: ActionConfig) -> Self {
        Self {
            request_bluetooth_permission: config.request_bluetooth_permission,
            request_location_permission: config.request_location_permission,
            use_internet: config.use_internet,
            use_bluetooth: config.use_bluetooth,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Operations still in flight after this many seconds are canceled and
    /// retired. Absent means never.
    pub stale_operation_secs: Option<u64>,
}

impl BridgeConfig {
    #[must_use]
    pub fn stale_operation_after(&self) -> Option<Duration> {
        self.stale_operation_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl LatchkeyConfig {
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        Self::load_from(&path)
    }

    /// Missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".latchkey").join("config.toml"))
}
