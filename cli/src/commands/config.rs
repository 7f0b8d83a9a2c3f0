//! `tilewall config`: show and edit component settings.
//!
//! Works on the settings file alone, so no launcher root is needed.

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use tilewall_common::{ComponentKind, ComponentSettings, FleetSettings};

use crate::app::AppContext;
use crate::domain::config::{get_value, set_value, valid_keys};
use crate::output::json;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show every component's settings
    Show,
    /// Print one setting
    Get {
        /// Component
        kind: ComponentKind,
        /// Setting name
        key: String,
    },
    /// Change one setting
    ///
    /// Hook scripts accept `\n` as a line separator.
    Set {
        /// Component
        kind: ComponentKind,
        /// Setting name
        key: String,
        /// New value (empty clears optional settings)
        value: String,
    },
    /// Restore the default settings of every component
    Reset,
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error for unknown keys, invalid values, or when the settings
/// cannot be written.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => show(app),
        ConfigCommand::Get { kind, key } => get(app, kind, &key),
        ConfigCommand::Set { kind, key, value } => set(app, kind, &key, &value),
        ConfigCommand::Reset => reset(app),
    }
}

fn rendered(settings: &ComponentSettings) -> Result<BTreeMap<&'static str, String>> {
    valid_keys(settings.kind())
        .into_iter()
        .map(|key| Ok((key, get_value(settings, key)?)))
        .collect()
}

fn show(app: &AppContext) -> Result<ExitCode> {
    let (session, settings) = app.open_settings()?;

    if app.is_json() {
        let all = settings
            .iter()
            .map(|s| Ok((s.kind(), rendered(s)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        json::print(&all)?;
        return Ok(ExitCode::SUCCESS);
    }

    app.output
        .header(&format!("Settings ({})", session.location()));
    for component in settings.iter() {
        println!();
        app.output.header(component.kind().label());
        for key in valid_keys(component.kind()) {
            let value = get_value(component, key)?;
            app.output.kv(&format!("{key:<18}"), &value.replace('\n', "\\n"));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn get(app: &AppContext, kind: ComponentKind, key: &str) -> Result<ExitCode> {
    let (_session, settings) = app.open_settings()?;
    let value = get_value(settings.get(kind), key)?;
    if app.is_json() {
        json::print(&serde_json::json!({ "kind": kind, "key": key, "value": value }))?;
    } else {
        println!("{value}");
    }
    Ok(ExitCode::SUCCESS)
}

fn set(app: &AppContext, kind: ComponentKind, key: &str, value: &str) -> Result<ExitCode> {
    let (session, mut settings) = app.open_settings()?;
    set_value(settings.get_mut(kind), key, value)?;
    session.save_checked(&settings)?;

    let stored = get_value(settings.get(kind), key)?;
    if app.is_json() {
        json::print(&serde_json::json!({ "kind": kind, "key": key, "value": stored }))?;
    }
    app.output
        .success(&format!("Set {kind}.{key} = {}", stored.replace('\n', "\\n")));
    Ok(ExitCode::SUCCESS)
}

/// Defaults for every kind. Tracked processes stay tracked so a running
/// fleet can still be stopped.
fn reset_keeping_tracking(current: &FleetSettings) -> FleetSettings {
    let mut fresh = FleetSettings::default();
    for old in current.iter() {
        fresh.get_mut(old.kind()).adopt_tracking(old);
    }
    fresh
}

fn reset(app: &AppContext) -> Result<ExitCode> {
    let (mut session, settings) = app.open_settings()?;
    if !app.confirm(
        &format!("Reset all component settings in {}?", session.location()),
        false,
    )? {
        app.output.info("Nothing changed.");
        return Ok(ExitCode::SUCCESS);
    }

    session.overwrite(&reset_keeping_tracking(&settings))?;
    if app.is_json() {
        json::print(&serde_json::json!({ "reset": true }))?;
    }
    app.output.success("Settings reset to defaults");
    Ok(ExitCode::SUCCESS)
}
