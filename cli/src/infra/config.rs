//! Launcher configuration loaded from `TILEWALL_*` environment variables.
//!
//! Each field maps to `TILEWALL_<FIELD>`:
//!   - `TILEWALL_ROOT`              install root of the display-wall software
//!                                  (required to start or stop components)
//!   - `TILEWALL_INTERPRETER`       interpreter for scripted components
//!                                  (default `python3`)
//!   - `TILEWALL_SETTINGS`          settings file
//!                                  (default `~/.tilewall/settings.yaml`)
//!   - `TILEWALL_DISPLAY_CONF`      display service configuration
//!                                  (default `<root>/bin/fsManager.conf`)
//!   - `TILEWALL_SETTLE_DELAY_MS`   wait after starting the display service
//!                                  (default `2000`)
//!   - `TILEWALL_POLL_INTERVAL_MS`  pause between output reads (default `300`)
//!   - `TILEWALL_LOG_DIR`           per-component output logs
//!                                  (default `logs/` next to the settings file)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{ConfigError, Layout};

pub const ENV_PREFIX: &str = "TILEWALL_";

#[derive(Debug, Clone, Deserialize)]
pub struct LauncherConfig {
    pub root: Option<PathBuf>,

    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    pub settings: Option<PathBuf>,

    pub display_conf: Option<PathBuf>,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    pub log_dir: Option<PathBuf>,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    300
}

impl LauncherConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Launcher` when a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX)
            .from_env()
            .map_err(|e| ConfigError::Launcher(e.to_string()))
    }

    /// Load from explicit `(name, value)` pairs, names including the prefix.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Launcher` when a variable has an invalid value.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| ConfigError::Launcher(e.to_string()))
    }

    /// Install layout. Needs `TILEWALL_ROOT`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Launcher` when the root is not configured.
    pub fn layout(&self) -> Result<Layout, ConfigError> {
        let root = self.root.clone().ok_or_else(|| {
            ConfigError::Launcher(format!("{ENV_PREFIX}ROOT is not set (install root of the display wall)"))
        })?;
        Ok(Layout::new(root, self.interpreter.clone()))
    }

    /// Display service configuration file naming the tile configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Launcher` when neither the file nor the root is
    /// configured.
    pub fn display_conf_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.display_conf {
            Some(path) => Ok(path.clone()),
            None => Ok(self.layout()?.bin_dir().join("fsManager.conf")),
        }
    }

    /// Directory of the component logs, given where the settings live.
    #[must_use]
    pub fn log_dir(&self, settings_path: &Path) -> PathBuf {
        match &self.log_dir {
            Some(dir) => dir.clone(),
            None => settings_path
                .parent()
                .map_or_else(|| PathBuf::from("logs"), |dir| dir.join("logs")),
        }
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
