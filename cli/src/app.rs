//! Application context: state shared by every command handler.
//!
//! `AppContext` carries the output context, the launcher configuration read
//! from the environment and the prompt policy. Commands build their fleet or
//! settings session through it so wiring lives in one place.

use std::sync::Arc;

use anyhow::{Context, Result};
use tilewall_common::FleetSettings;

use crate::application::ports::OutputSink;
use crate::application::services::{Persistence, Registry, SettingsSession, SupervisorContext};
use crate::domain::{CommandBuilder, Platform};
use crate::infra::{LauncherConfig, OsDispatcher, TileConfigSource, YamlSettingsStore};
use crate::output::{OutputContext, TerminalReporter};

/// The production fleet.
pub type Fleet = Registry<OsDispatcher, YamlSettingsStore>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `TILEWALL_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Launcher configuration from `TILEWALL_*` variables.
    pub config: LauncherConfig,
    /// When `true`, prompts are skipped and answered yes.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `TILEWALL_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: &AppFlags, config: LauncherConfig) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("TILEWALL_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            // JSON mode replaces human output, so the human printers go quiet.
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config,
            non_interactive,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn terminal_reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// The settings store named by `TILEWALL_SETTINGS`, or the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn settings_store(&self) -> Result<YamlSettingsStore> {
        match &self.config.settings {
            Some(path) => Ok(YamlSettingsStore::with_path(path.clone())),
            None => YamlSettingsStore::new(),
        }
    }

    /// Open the settings, warning when they could not be loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings store cannot be located.
    pub fn open_settings(&self) -> Result<(SettingsSession<YamlSettingsStore>, FleetSettings)> {
        let (session, settings) = SettingsSession::open(self.settings_store()?);
        if session.persistence() == Persistence::Disabled && !self.is_json() {
            self.output.warn(&format!(
                "Could not load {}; using defaults and leaving the file untouched",
                session.location()
            ));
        }
        Ok((session, settings))
    }

    /// Build the supervisor fleet. Component output goes to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if `TILEWALL_ROOT` is not set or the settings store
    /// cannot be located.
    pub fn fleet(&self, sink: Arc<dyn OutputSink>) -> Result<Fleet> {
        let layout = self.config.layout().context("launcher configuration")?;
        let display_conf = self
            .config
            .display_conf_path()
            .context("launcher configuration")?;
        let (session, settings) = self.open_settings()?;
        let log_dir = self.config.log_dir(self.settings_store()?.path());

        let ctx = SupervisorContext {
            builder: CommandBuilder::new(layout, Platform::current()),
            dispatcher: Arc::new(OsDispatcher::new(log_dir)),
            topology: Arc::new(TileConfigSource::new(display_conf)),
            sink,
            poll_interval: self.config.poll_interval(),
        };
        Ok(Registry::new(
            &ctx,
            session,
            &settings,
            self.config.settle_delay(),
        ))
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `TILEWALL_YES`
    /// env), returns `true` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
