//! Infrastructure implementation of the `ProcessTable` port.

use chrono::{DateTime, Utc};
use sysinfo::{Pid, Process, ProcessStatus, System};

use crate::application::ports::ProcessTable;

/// Snapshot of the OS process table, taken at construction.
pub struct SysinfoProcessTable {
    system: System,
}

impl SysinfoProcessTable {
    #[must_use]
    pub fn snapshot() -> Self {
        let mut system = System::new();
        system.refresh_processes();
        Self { system }
    }

    fn live(&self, pid: u32) -> Option<&Process> {
        // A zombie still has a table entry but is already dead.
        self.system
            .process(Pid::from_u32(pid))
            .filter(|p| p.status() != ProcessStatus::Zombie)
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn is_running(&self, pid: u32) -> bool {
        self.live(pid).is_some()
    }

    fn started_at(&self, pid: u32) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.live(pid)?.start_time()).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}
