//! `tilewall start`: start components and stream their output.

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tilewall_common::ComponentKind;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app::{AppContext, Fleet};
use crate::application::services::{Exited, StartOutcome};
use crate::commands::{fleet_order, report_stale, stop};
use crate::domain::OutputBuffer;
use crate::infra::{ChannelSink, OutputEvent, SysinfoProcessTable};
use crate::output::{ComponentEcho, json};

/// How often held processes are polled for exit.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// Buffered lines shown when a component fails while output is quiet.
const EXIT_TAIL_LINES: usize = 20;

/// Arguments for the start command.
#[derive(Args, Default)]
pub struct StartArgs {
    /// Components to start (default: every enabled component, display
    /// service first)
    #[arg(value_name = "KIND")]
    pub kinds: Vec<ComponentKind>,

    /// Stop the fleet on Ctrl-C instead of leaving it running
    #[arg(long)]
    pub stop_on_exit: bool,
}

/// One line of `--json` output.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Started { kind: ComponentKind, pid: u32 },
    AlreadyRunning { kind: ComponentKind },
    Failed { kind: ComponentKind },
    Output { kind: ComponentKind, text: &'a str },
    Exited { kind: ComponentKind, code: Option<i32> },
}

/// Run `tilewall start`.
///
/// # Errors
///
/// Returns an error if the launcher configuration is incomplete or output
/// cannot be written.
pub async fn run(app: &AppContext, args: &StartArgs) -> Result<ExitCode> {
    let (sink, mut rx) = ChannelSink::channel();
    let mut fleet = app.fleet(Arc::new(sink))?;
    report_stale(app, &fleet.reconcile_stale_pids(&SysinfoProcessTable::snapshot()));

    let outcomes = if args.kinds.is_empty() {
        let reporter = app.terminal_reporter();
        fleet.start_fleet(&reporter).await
    } else {
        fleet_order(&args.kinds)
            .into_iter()
            .map(|kind| (kind, fleet.start(kind)))
            .collect()
    };
    if outcomes.is_empty() {
        app.output.info("No component is enabled. Enable one with: tilewall config set <kind> enabled true");
    }
    let mut any_failed = report_outcomes(app, &outcomes)?;

    let mut view = OutputView::new(app);
    if fleet.supervisors().any(|s| s.has_handle()) {
        app.output.info("Streaming output. Press Ctrl-C to leave.");
        supervise(&mut fleet, &mut rx, &mut view).await?;
    }
    while let Ok((kind, text)) = rx.try_recv() {
        view.output(kind, &text)?;
    }

    if args.stop_on_exit {
        any_failed |= stop::report(app, &fleet.stop_fleet())?;
    } else {
        fleet.stop_reading_all();
    }

    Ok(if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn report_outcomes(app: &AppContext, outcomes: &[(ComponentKind, StartOutcome)]) -> Result<bool> {
    let mut any_failed = false;
    for &(kind, outcome) in outcomes {
        let label = kind.label();
        let event = match outcome {
            StartOutcome::Started { pid } => {
                app.output.success(&format!("{label} started (pid {pid})"));
                Event::Started { kind, pid }
            }
            StartOutcome::AlreadyRunning => {
                app.output.info(&format!("{label} is already running"));
                Event::AlreadyRunning { kind }
            }
            StartOutcome::Failed => {
                any_failed = true;
                app.output.error(&format!(
                    "{label} could not be started (run with --verbose for details)"
                ));
                Event::Failed { kind }
            }
        };
        if app.is_json() {
            json::print_line(&event)?;
        }
    }
    Ok(any_failed)
}

/// Stream output and watch for exits until Ctrl-C or until no supervised
/// process is left.
async fn supervise(
    fleet: &mut Fleet,
    rx: &mut UnboundedReceiver<OutputEvent>,
    view: &mut OutputView<'_>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(LIVENESS_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                }
                break;
            }
            Some((kind, text)) = rx.recv() => view.output(kind, &text)?,
            _ = ticker.tick() => {
                for exited in fleet.reap_exited() {
                    view.exited(exited)?;
                }
                if !fleet.supervisors().any(|s| s.has_handle()) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Renders streamed output and keeps a bounded history per component.
struct OutputView<'a> {
    app: &'a AppContext,
    echo: ComponentEcho,
    history: [OutputBuffer; ComponentKind::ALL.len()],
}

impl<'a> OutputView<'a> {
    fn new(app: &'a AppContext) -> Self {
        Self {
            app,
            echo: app.output.echo(),
            history: Default::default(),
        }
    }

    fn output(&mut self, kind: ComponentKind, text: &str) -> Result<()> {
        self.history[kind as usize].push(text);
        if self.app.is_json() {
            json::print_line(&Event::Output { kind, text })?;
        } else if !self.app.output.quiet {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(self.echo.render(kind, text).as_bytes())?;
            stdout.flush()?;
        }
        Ok(())
    }

    fn exited(&mut self, exited: Exited) -> Result<()> {
        let Exited { kind, status } = exited;
        if self.app.is_json() {
            let code = status.and_then(|s| s.code());
            return json::print_line(&Event::Exited { kind, code });
        }
        match status {
            Some(s) if s.success() => self.app.output.info(&format!("{} exited", kind.label())),
            _ => {
                let how = status.map_or_else(|| "status unknown".to_string(), |s| s.to_string());
                self.app
                    .output
                    .error(&format!("{} exited ({how})", kind.label()));
                if self.app.output.quiet {
                    for line in self.history[kind as usize].tail(EXIT_TAIL_LINES) {
                        eprintln!("    {line}");
                    }
                }
            }
        }
        Ok(())
    }
}
