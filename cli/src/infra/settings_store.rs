//! Infrastructure implementation of the `SettingsStore` port.
//!
//! `YamlSettingsStore` keeps the fleet settings in one YAML file, written
//! atomically (temp file + rename) with owner-only permissions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tilewall_common::FleetSettings;

use crate::application::ports::SettingsStore;
use crate::domain::ConfigError;

/// Settings file manager implementing `SettingsStore`.
pub struct YamlSettingsStore {
    path: PathBuf,
}

impl YamlSettingsStore {
    /// Create a store at the default path (`~/.tilewall/settings.yaml`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".tilewall").join("settings.yaml")))
    }

    /// Create a store with an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for YamlSettingsStore {
    fn load(&self) -> Result<Option<FleetSettings>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Unreadable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn save(&self, settings: &FleetSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(settings).context("serializing settings")?;

        let temp_path = self.path.with_extension("yaml.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing settings file {}", self.path.display()))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
