//! Application service: the fleet of supervisors.
//!
//! One supervisor per component kind, held in fleet order. Every operation
//! that can change a tracked PID persists the settings afterwards.

use std::process::ExitStatus;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tilewall_common::{ComponentKind, ComponentSettings, FleetSettings};

use crate::application::ports::{Dispatcher, ProcessTable, ProgressReporter, SettingsStore};
use crate::application::services::settings_session::SettingsSession;
use crate::application::services::supervisor::{
    StartOutcome, StopOutcome, Supervisor, SupervisorContext,
};
use crate::domain::ConfigError;

/// Default wait after starting the display service before the rest of the
/// fleet is started.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// A component whose tracked process was found to have exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exited {
    pub kind: ComponentKind,
    pub status: Option<ExitStatus>,
}

pub struct Registry<D: Dispatcher, S> {
    supervisors: [Supervisor<D>; 5],
    session: SettingsSession<S>,
    settle_delay: Duration,
}

impl<D: Dispatcher, S: SettingsStore> Registry<D, S> {
    #[must_use]
    pub fn new(
        ctx: &SupervisorContext<D>,
        session: SettingsSession<S>,
        settings: &FleetSettings,
        settle_delay: Duration,
    ) -> Self {
        let supervisors =
            ComponentKind::ALL.map(|kind| Supervisor::new(settings.get(kind).clone(), ctx.clone()));
        Self {
            supervisors,
            session,
            settle_delay,
        }
    }

    fn index(kind: ComponentKind) -> usize {
        kind as usize
    }

    #[must_use]
    pub fn supervisor(&self, kind: ComponentKind) -> &Supervisor<D> {
        &self.supervisors[Self::index(kind)]
    }

    pub fn supervisor_mut(&mut self, kind: ComponentKind) -> &mut Supervisor<D> {
        &mut self.supervisors[Self::index(kind)]
    }

    pub fn supervisors(&self) -> impl Iterator<Item = &Supervisor<D>> {
        self.supervisors.iter()
    }

    #[must_use]
    pub fn session(&self) -> &SettingsSession<S> {
        &self.session
    }

    /// Snapshot of every supervisor's settings.
    #[must_use]
    pub fn settings(&self) -> FleetSettings {
        let mut fleet = FleetSettings::default();
        for supervisor in &self.supervisors {
            fleet.set(supervisor.settings().clone());
        }
        fleet
    }

    /// Save the tracked PIDs and pick up settings edited by other sessions
    /// since this registry was built.
    fn persist(&mut self) {
        if let Some(stored) = self.session.save_tracking(&self.settings()) {
            for supervisor in &mut self.supervisors {
                *supervisor.settings_mut() = stored.get(supervisor.kind()).clone();
            }
        }
    }

    /// Start every enabled component. The display service goes first and the
    /// rest follow after the settling delay, in fleet order.
    pub async fn start_fleet(
        &mut self,
        reporter: &impl ProgressReporter,
    ) -> Vec<(ComponentKind, StartOutcome)> {
        let mut outcomes = Vec::new();
        let primary = ComponentKind::DisplayService;

        if self.supervisor(primary).settings().enabled {
            outcomes.push((primary, self.supervisor_mut(primary).start()));
            if !self.settle_delay.is_zero() {
                reporter.step(&format!(
                    "Waiting {:.1}s for the {} to settle",
                    self.settle_delay.as_secs_f64(),
                    primary.label()
                ));
                tokio::time::sleep(self.settle_delay).await;
                reporter.success(&format!("{} settled", primary.label()));
            }
        }

        for kind in ComponentKind::ALL.into_iter().filter(|k| !k.is_primary()) {
            let supervisor = self.supervisor_mut(kind);
            if supervisor.settings().enabled {
                outcomes.push((kind, supervisor.start()));
            }
        }

        self.persist();
        outcomes
    }

    /// Stop every component not configured to run in the background.
    pub fn stop_fleet(&mut self) -> Vec<(ComponentKind, StopOutcome)> {
        let outcomes = self
            .supervisors
            .iter_mut()
            .filter(|s| !s.settings().run_in_background)
            .map(|s| (s.kind(), s.stop()))
            .collect();
        self.persist();
        outcomes
    }

    pub fn start(&mut self, kind: ComponentKind) -> StartOutcome {
        let outcome = self.supervisor_mut(kind).start();
        self.persist();
        outcome
    }

    pub fn stop(&mut self, kind: ComponentKind) -> StopOutcome {
        let outcome = self.supervisor_mut(kind).stop();
        self.persist();
        outcome
    }

    pub fn is_alive(&mut self, kind: ComponentKind) -> bool {
        let was_tracked = self.supervisor(kind).pid().is_some();
        let alive = self.supervisor_mut(kind).is_alive();
        if was_tracked && !alive {
            self.persist();
        }
        alive
    }

    /// Stop every output reader. Processes keep running.
    pub fn stop_reading_all(&mut self) {
        for supervisor in &mut self.supervisors {
            supervisor.stop_reading();
        }
    }

    /// Poll every held process and reclaim the ones that have exited.
    pub fn reap_exited(&mut self) -> Vec<Exited> {
        let exited: Vec<Exited> = self
            .supervisors
            .iter_mut()
            .filter(|s| s.has_handle())
            .filter_map(|s| {
                (!s.is_alive()).then(|| Exited {
                    kind: s.kind(),
                    status: s.last_exit(),
                })
            })
            .collect();
        if !exited.is_empty() {
            self.persist();
        }
        exited
    }

    /// Clear persisted PIDs that no longer name the process that was
    /// started: PIDs the OS no longer knows, and PIDs whose current owner
    /// started after the recorded start time. Dead hook PIDs are dropped too.
    /// Returns the cleared component PIDs.
    pub fn reconcile_stale_pids(&mut self, table: &impl ProcessTable) -> Vec<(ComponentKind, u32)> {
        let mut cleared = Vec::new();
        let mut changed = false;
        for supervisor in &mut self.supervisors {
            let hooks = &mut supervisor.settings_mut().hook_pids;
            let before = hooks.len();
            hooks.retain(|&pid| table.is_running(pid));
            changed |= hooks.len() != before;

            if supervisor.has_handle() {
                continue;
            }
            let settings = supervisor.settings();
            let Some(pid) = settings.last_known_pid else {
                continue;
            };
            let stale = !table.is_running(pid)
                || pid_was_reused(settings.last_started_at, table.started_at(pid));
            if stale && supervisor.forget_pid().is_some() {
                tracing::info!(component = %supervisor.kind(), pid, "cleared stale pid");
                cleared.push((supervisor.kind(), pid));
            }
        }
        if changed || !cleared.is_empty() {
            self.persist();
        }
        cleared
    }

    /// Edit one component's settings and persist the result.
    ///
    /// # Errors
    ///
    /// Returns the editor's error, or an error if the result cannot be
    /// persisted. The edit is kept in memory either way.
    pub fn update_settings<T>(
        &mut self,
        kind: ComponentKind,
        edit: impl FnOnce(&mut ComponentSettings) -> Result<T, ConfigError>,
    ) -> anyhow::Result<T> {
        let value = edit(self.supervisor_mut(kind).settings_mut())?;
        self.session.save_checked(&self.settings())?;
        Ok(value)
    }
}

/// A process that started after the recorded start of ours holds a reused
/// PID. The OS start time has whole-second resolution and is derived from
/// the boot time, so it may read up to two seconds late.
fn pid_was_reused(recorded: Option<DateTime<Utc>>, actual: Option<DateTime<Utc>>) -> bool {
    match (recorded, actual) {
        (Some(recorded), Some(actual)) => {
            actual.signed_duration_since(recorded) > TimeDelta::seconds(2)
        }
        _ => false,
    }
}
