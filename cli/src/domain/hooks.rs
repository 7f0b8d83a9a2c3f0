//! Pre-start and post-stop hook scripts.
//!
//! A hook script is newline-separated. Every line becomes one command, split
//! on whitespace.

use tilewall_common::{ComponentSettings, KindSettings};

use crate::domain::command::CommandLine;

/// Commands to run before starting. Lines whose trimmed text starts with `#`
/// are comments. Blank lines are skipped.
#[must_use]
pub fn pre_start(settings: &ComponentSettings) -> Vec<CommandLine> {
    match &settings.details {
        KindSettings::DisplayService(display) => display
            .on_start
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(CommandLine::from_hook_line)
            .collect(),
        _ => Vec::new(),
    }
}

/// Commands to run after stopping. Every non-blank line runs, including ones
/// starting with `#`.
#[must_use]
pub fn post_stop(settings: &ComponentSettings) -> Vec<CommandLine> {
    match &settings.details {
        KindSettings::DisplayService(display) => display
            .on_stop
            .lines()
            .filter_map(CommandLine::from_hook_line)
            .collect(),
        _ => Vec::new(),
    }
}
