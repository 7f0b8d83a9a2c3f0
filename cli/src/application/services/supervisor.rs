//! Application service: lifecycle of one supervised component.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All process I/O is routed through the injected `Dispatcher`.
//!
//! Nothing here returns an error to the caller. Failures are logged once with
//! `component`, `op` and `error` fields and the supervisor falls back to a
//! safe state.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tilewall_common::{ComponentKind, ComponentSettings};

use crate::application::ports::{Dispatcher, OutputSink, ProcessHandle, TopologySource};
use crate::application::services::output_reader::OutputReader;
use crate::domain::kill::KillPlan;
use crate::domain::topology::with_loopback;
use crate::domain::{
    CommandBuilder, CommandLine, KillError, StopPolicy, SupervisorError, SupervisorState, hooks,
};

/// Marker written to the sink when `start()` finds the component alive.
pub const ALREADY_RUNNING: &str = "\n\n**** Already running ****\n\n";

/// Collaborators shared by every supervisor of a fleet.
pub struct SupervisorContext<D> {
    pub builder: CommandBuilder,
    pub dispatcher: Arc<D>,
    pub topology: Arc<dyn TopologySource>,
    pub sink: Arc<dyn OutputSink>,
    pub poll_interval: Duration,
}

impl<D> Clone for SupervisorContext<D> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            topology: Arc::clone(&self.topology),
            sink: Arc::clone(&self.sink),
            poll_interval: self.poll_interval,
        }
    }
}

/// Outcome of [`Supervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was spawned.
    Started { pid: u32 },
    /// The component was already alive. Nothing changed.
    AlreadyRunning,
    /// The start command could not be spawned. The supervisor stayed idle.
    Failed,
}

/// Outcome of [`Supervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Kill commands were dispatched. `failed` of them could not be spawned.
    Stopped { dispatched: usize, failed: usize },
    /// The component was not tracked as alive, so nothing was signalled.
    NotRunning,
}

/// Supervises one component: start, liveness, stop and zombie reclamation.
pub struct Supervisor<D: Dispatcher> {
    kind: ComponentKind,
    settings: ComponentSettings,
    ctx: SupervisorContext<D>,
    phase: SupervisorState,
    running: bool,
    process: Option<D::Process>,
    reader: Option<OutputReader>,
    last_exit: Option<ExitStatus>,
}

impl<D: Dispatcher> Supervisor<D> {
    #[must_use]
    pub fn new(settings: ComponentSettings, ctx: SupervisorContext<D>) -> Self {
        Self {
            kind: settings.kind(),
            settings,
            ctx,
            phase: SupervisorState::Idle,
            running: false,
            process: None,
            reader: None,
            last_exit: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn settings(&self) -> &ComponentSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ComponentSettings {
        &mut self.settings
    }

    /// Current phase. A PID carried over from an earlier session counts as
    /// running.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        match self.phase {
            SupervisorState::Idle if self.settings.last_known_pid.is_some() => {
                SupervisorState::Running
            }
            phase => phase,
        }
    }

    /// PID of the live handle, or else the persisted one.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process
            .as_ref()
            .map(ProcessHandle::pid)
            .or(self.settings.last_known_pid)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.settings.last_started_at
    }

    /// Whether a process spawned by this supervisor is held.
    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.process.is_some()
    }

    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().is_some_and(|r| !r.is_finished())
    }

    /// Exit status of the last process reclaimed as a zombie.
    #[must_use]
    pub fn last_exit(&self) -> Option<ExitStatus> {
        self.last_exit
    }

    /// PIDs of pre-start hook commands still to be terminated on stop,
    /// including ones recorded by an earlier session.
    #[must_use]
    pub fn hook_pids(&self) -> &[u32] {
        &self.settings.hook_pids
    }

    /// Whether the component is believed alive. A held process that has
    /// exited is reclaimed here and reported dead.
    pub fn is_alive(&mut self) -> bool {
        if let Some(process) = self.process.as_mut() {
            match process.try_wait() {
                Ok(None) => return true,
                Ok(Some(status)) => {
                    self.reclaim_zombie(Some(status));
                    return false;
                }
                Err(e) => {
                    tracing::warn!(component = %self.kind, op = "poll", error = %e, "cannot poll process");
                    self.reclaim_zombie(None);
                    return false;
                }
            }
        }
        self.running || self.settings.last_known_pid.is_some()
    }

    fn reclaim_zombie(&mut self, status: Option<ExitStatus>) {
        self.phase = SupervisorState::Zombie;
        tracing::info!(
            component = %self.kind,
            pid = ?self.pid(),
            status = ?status,
            "process exited"
        );
        // The process is gone, so its output is finite. The reader drains
        // what is left and ends on its own.
        if let Some(reader) = self.reader.take() {
            reader.detach();
        }
        self.process = None;
        self.running = false;
        self.settings.untrack();
        self.last_exit = status;
        self.phase = SupervisorState::Idle;
    }

    /// Start the component unless it is already alive.
    pub fn start(&mut self) -> StartOutcome {
        if self.is_alive() {
            self.ctx.sink.deliver(self.kind, ALREADY_RUNNING);
            return StartOutcome::AlreadyRunning;
        }

        self.phase = SupervisorState::Starting;
        self.run_pre_start_hooks();

        let cmd = self.ctx.builder.start_command(&self.settings);
        let mut process = match self.ctx.dispatcher.run(self.kind, &cmd) {
            Ok(process) => process,
            Err(e) => {
                self.log_failure("start", &e.into());
                self.phase = SupervisorState::Idle;
                return StartOutcome::Failed;
            }
        };

        let pid = process.pid();
        if let Some(stream) = process.take_output() {
            match OutputReader::spawn(
                self.kind,
                stream,
                Arc::clone(&self.ctx.sink),
                self.ctx.poll_interval,
            ) {
                Ok(reader) => self.reader = Some(reader),
                Err(e) => self.log_failure("read", &e.into()),
            }
        }

        self.process = Some(process);
        self.running = true;
        self.last_exit = None;
        self.settings.track(pid, Utc::now());
        self.phase = SupervisorState::Running;
        tracing::info!(component = %self.kind, pid, command = %cmd, "component started");
        StartOutcome::Started { pid }
    }

    fn run_pre_start_hooks(&mut self) {
        for cmd in hooks::pre_start(&self.settings) {
            match self.ctx.dispatcher.run_detached(&cmd) {
                Ok(pid) => {
                    tracing::debug!(component = %self.kind, pid, command = %cmd, "pre-start hook spawned");
                    self.settings.hook_pids.push(pid);
                }
                Err(e) => self.log_failure("pre_start", &e.into()),
            }
        }
    }

    /// Stop the component according to its kind's stop policy, then run the
    /// post-stop hooks. The supervisor ends idle whatever happens.
    pub fn stop(&mut self) -> StopOutcome {
        self.phase = SupervisorState::Stopping;
        let mut dispatched = 0;
        let mut failures: Vec<SupervisorError> = Vec::new();

        let acted = match StopPolicy::for_kind(self.kind) {
            StopPolicy::Unconditional => {
                let plan = self.kill_plan();
                for cmd in plan.commands() {
                    dispatched += 1;
                    if let Err(e) = self.dispatch_kill(cmd) {
                        failures.push(e);
                    }
                }
                for pid in std::mem::take(&mut self.settings.hook_pids) {
                    dispatched += 1;
                    let cmd = self.ctx.builder.killer().kill_pid(pid);
                    if let Err(e) = self.dispatch_kill(&cmd) {
                        failures.push(e);
                    }
                }
                true
            }
            StopPolicy::WhenAlive => {
                if self.is_alive() {
                    if let Some(pid) = self.pid() {
                        dispatched += 1;
                        let cmd = self.ctx.builder.killer().kill_pid(pid);
                        if let Err(e) = self.dispatch_kill(&cmd) {
                            failures.push(e);
                        }
                    }
                    true
                } else {
                    false
                }
            }
        };

        for cmd in hooks::post_stop(&self.settings) {
            if let Err(e) = self.ctx.dispatcher.run_detached(&cmd) {
                failures.push(e.into());
            }
        }

        for err in &failures {
            self.log_failure("stop", err);
        }
        self.reset();

        if acted {
            tracing::info!(component = %self.kind, dispatched, failed = failures.len(), "component stopped");
            StopOutcome::Stopped {
                dispatched,
                failed: failures.len(),
            }
        } else {
            StopOutcome::NotRunning
        }
    }

    fn kill_plan(&self) -> KillPlan {
        let hosts = if self.kind.is_primary() && self.ctx.builder.killer().targets_hosts() {
            match self.ctx.topology.load() {
                Ok(topology) => topology.kill_targets(),
                Err(e) => {
                    self.log_failure("topology", &e.into());
                    with_loopback(Vec::new())
                }
            }
        } else {
            Vec::new()
        };
        self.ctx.builder.kill_plan(&self.settings, &hosts)
    }

    fn dispatch_kill(&self, cmd: &CommandLine) -> Result<(), SupervisorError> {
        tracing::debug!(component = %self.kind, command = %cmd, "dispatching kill");
        self.ctx
            .dispatcher
            .run_detached(cmd)
            .map(drop)
            .map_err(|e| KillError::from_spawn(self.kind, e).into())
    }

    fn reset(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.stop();
        }
        self.process = None;
        self.running = false;
        self.settings.untrack();
        self.phase = SupervisorState::Idle;
    }

    /// Tell the output reader to stop. The process keeps running.
    pub fn stop_reading(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.stop();
        }
    }

    /// Forget a persisted PID that no longer names a live process. A held
    /// handle is authoritative and is never overridden.
    pub fn forget_pid(&mut self) -> Option<u32> {
        if self.process.is_some() {
            return None;
        }
        let pid = self.settings.last_known_pid?;
        self.settings.untrack();
        self.running = false;
        Some(pid)
    }

    fn log_failure(&self, op: &'static str, err: &SupervisorError) {
        tracing::warn!(component = %self.kind, op, error = %err, "supervision step failed");
    }
}

impl<D: Dispatcher> Drop for Supervisor<D> {
    fn drop(&mut self) {
        self.stop_reading();
    }
}
