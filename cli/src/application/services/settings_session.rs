//! Application service: settings load and save for one launcher session.
//!
//! A store that cannot be read is never overwritten: the session falls back
//! to defaults and every later save becomes a no-op.

use tilewall_common::FleetSettings;

use crate::application::ports::SettingsStore;
use crate::domain::ConfigError;

/// Whether saves reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Enabled,
    /// Loading failed. Saving would clobber the file the user may still fix.
    Disabled,
}

pub struct SettingsSession<S> {
    store: S,
    persistence: Persistence,
}

impl<S: SettingsStore> SettingsSession<S> {
    /// Load settings from `store`. Kinds missing from the store keep their
    /// defaults. On any load error the defaults are returned and persistence
    /// is disabled.
    pub fn open(store: S) -> (Self, FleetSettings) {
        match load_checked(&store) {
            Ok(settings) => (
                Self {
                    store,
                    persistence: Persistence::Enabled,
                },
                settings,
            ),
            Err(e) => {
                tracing::warn!(
                    location = %store.location(),
                    error = %e,
                    "settings could not be loaded; using defaults and not saving this session"
                );
                (
                    Self {
                        store,
                        persistence: Persistence::Disabled,
                    },
                    FleetSettings::default(),
                )
            }
        }
    }

    #[must_use]
    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    #[must_use]
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Write the supervision-owned fields of `current` (tracked PID, start
    /// time, hook PIDs) over what the store holds now. Every other field keeps
    /// its stored value, so edits saved by another session survive.
    ///
    /// Returns the record written, or `None` when nothing was saved. Failures
    /// are logged, not returned.
    pub fn save_tracking(&self, current: &FleetSettings) -> Option<FleetSettings> {
        if self.persistence == Persistence::Disabled {
            tracing::debug!("settings persistence disabled; skipping save");
            return None;
        }
        let mut merged = match load_checked(&self.store) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    location = %self.store.location(),
                    error = %e,
                    "settings can no longer be loaded; not saving tracked pids"
                );
                return None;
            }
        };
        for settings in current.iter() {
            merged.get_mut(settings.kind()).adopt_tracking(settings);
        }
        match self.store.save(&merged) {
            Ok(()) => Some(merged),
            Err(e) => {
                tracing::warn!(location = %self.store.location(), error = %format!("{e:#}"), "settings save failed");
                None
            }
        }
    }

    /// Persist `settings`, reporting failure. Used by explicit edits, where
    /// the operator must learn that nothing was written.
    ///
    /// # Errors
    ///
    /// Returns an error if persistence is disabled or the write fails.
    pub fn save_checked(&self, settings: &FleetSettings) -> anyhow::Result<()> {
        if self.persistence == Persistence::Disabled {
            anyhow::bail!(
                "settings at {} could not be loaded; refusing to overwrite them",
                self.store.location()
            );
        }
        self.store.save(settings)
    }

    /// Write `settings` even when loading failed, then re-enable saving.
    /// Used by an explicit reset, which replaces whatever the store held.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Persistence is left unchanged.
    pub fn overwrite(&mut self, settings: &FleetSettings) -> anyhow::Result<()> {
        self.store.save(settings)?;
        self.persistence = Persistence::Enabled;
        Ok(())
    }
}

/// Stored settings completed with defaults. A record stored under the wrong
/// kind makes the whole file unusable.
fn load_checked<S: SettingsStore>(store: &S) -> Result<FleetSettings, ConfigError> {
    let settings = store.load()?.unwrap_or_default();
    match settings.mismatched_kinds().first() {
        Some(&slot) => Err(ConfigError::KindMismatch {
            slot,
            found: settings.get(slot).kind(),
        }),
        None => Ok(settings),
    }
}
