//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! On a terminal a `step` shows a spinner that the next `success` or `warn`
//! finishes. Elsewhere each event prints one line.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.ctx.show_progress() {
            if let Some(previous) = self.active.replace(Some(progress::spinner(message))) {
                previous.finish_and_clear();
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if let Some(pb) = self.active.take() {
            progress::finish_ok(&pb, message);
        } else if !self.ctx.quiet {
            println!("  {} {message}", "✓".style(self.ctx.styles.success));
        }
    }

    fn warn(&self, message: &str) {
        if let Some(pb) = self.active.take() {
            progress::finish_warn(&pb, message);
        } else if !self.ctx.quiet {
            println!("  {} {message}", "!".style(self.ctx.styles.warning));
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.active.take() {
            pb.finish_and_clear();
        }
    }
}
