//! `tilewall stop`: stop the fleet or the listed components.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tilewall_common::ComponentKind;

use crate::app::AppContext;
use crate::application::services::StopOutcome;
use crate::commands::{fleet_order, report_stale};
use crate::infra::{DiscardSink, SysinfoProcessTable};
use crate::output::json;

/// Arguments for the stop command.
#[derive(Args, Default)]
pub struct StopArgs {
    /// Components to stop (default: every component not running in the
    /// background)
    #[arg(value_name = "KIND")]
    pub kinds: Vec<ComponentKind>,
}

#[derive(Serialize)]
struct StopReport {
    kind: ComponentKind,
    stopped: bool,
    dispatched: usize,
    failed: usize,
}

/// Run `tilewall stop`.
///
/// # Errors
///
/// Returns an error if the launcher configuration is incomplete.
pub fn run(app: &AppContext, args: &StopArgs) -> Result<ExitCode> {
    let mut fleet = app.fleet(Arc::new(DiscardSink))?;
    // Dead PIDs, and PIDs now held by a process started after ours, are
    // forgotten before anything is signalled.
    report_stale(app, &fleet.reconcile_stale_pids(&SysinfoProcessTable::snapshot()));

    let outcomes = if args.kinds.is_empty() {
        fleet.stop_fleet()
    } else {
        fleet_order(&args.kinds)
            .into_iter()
            .map(|kind| (kind, fleet.stop(kind)))
            .collect()
    };

    Ok(if report(app, &outcomes)? {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Print stop outcomes. Returns whether any kill command failed to spawn.
pub(crate) fn report(app: &AppContext, outcomes: &[(ComponentKind, StopOutcome)]) -> Result<bool> {
    let reports: Vec<StopReport> = outcomes
        .iter()
        .map(|&(kind, outcome)| match outcome {
            StopOutcome::Stopped { dispatched, failed } => StopReport {
                kind,
                stopped: true,
                dispatched,
                failed,
            },
            StopOutcome::NotRunning => StopReport {
                kind,
                stopped: false,
                dispatched: 0,
                failed: 0,
            },
        })
        .collect();

    if app.is_json() {
        json::print(&reports)?;
    }
    for r in &reports {
        let label = r.kind.label();
        if !r.stopped {
            app.output.info(&format!("{label} is not running"));
        } else if r.failed == 0 {
            app.output.success(&format!(
                "{label} stopped ({} kill command{} sent)",
                r.dispatched,
                if r.dispatched == 1 { "" } else { "s" }
            ));
        } else {
            app.output.error(&format!(
                "{label}: {} of {} kill commands could not be sent",
                r.failed, r.dispatched
            ));
        }
    }
    Ok(reports.iter().any(|r| r.failed > 0))
}
