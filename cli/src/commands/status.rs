//! `tilewall status`: liveness of every component.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize as _;
use serde::Serialize;
use tilewall_common::ComponentKind;

use crate::app::AppContext;
use crate::commands::report_stale;
use crate::domain::SupervisorState;
use crate::infra::{DiscardSink, SysinfoProcessTable};
use crate::output::json;

#[derive(Debug, Serialize)]
struct ComponentStatus {
    kind: ComponentKind,
    label: &'static str,
    enabled: bool,
    background: bool,
    alive: bool,
    state: SupervisorState,
    pid: Option<u32>,
    started_at: Option<DateTime<Utc>>,
}

/// Run `tilewall status`.
///
/// # Errors
///
/// Returns an error if the launcher configuration is incomplete.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let mut fleet = app.fleet(Arc::new(DiscardSink))?;
    report_stale(app, &fleet.reconcile_stale_pids(&SysinfoProcessTable::snapshot()));

    let rows: Vec<ComponentStatus> = ComponentKind::ALL
        .into_iter()
        .map(|kind| {
            let alive = fleet.is_alive(kind);
            let supervisor = fleet.supervisor(kind);
            let settings = supervisor.settings();
            ComponentStatus {
                kind,
                label: kind.label(),
                enabled: settings.enabled,
                background: settings.run_in_background,
                alive,
                state: supervisor.state(),
                pid: supervisor.pid(),
                started_at: supervisor.started_at(),
            }
        })
        .collect();

    if app.is_json() {
        json::print(&rows)?;
    } else {
        render(app, &rows);
    }
    Ok(ExitCode::SUCCESS)
}

fn render(app: &AppContext, rows: &[ComponentStatus]) {
    let styles = &app.output.styles;
    app.output.header("Components");
    for row in rows {
        let mark = if row.alive {
            "●".style(styles.success).to_string()
        } else {
            "○".style(styles.dim).to_string()
        };
        let mut details = Vec::new();
        if let Some(pid) = row.pid {
            details.push(format!("pid {pid}"));
        }
        if let Some(at) = row.started_at {
            let local: DateTime<Local> = at.into();
            details.push(format!("since {}", local.format("%Y-%m-%d %H:%M:%S")));
        }
        if !row.enabled {
            details.push("disabled".to_string());
        }
        if row.background {
            details.push("background".to_string());
        }
        println!(
            "  {mark} {:<22} {:<8} {}",
            row.label,
            row.state.as_str(),
            details.join(", ").style(styles.dim)
        );
    }
}
