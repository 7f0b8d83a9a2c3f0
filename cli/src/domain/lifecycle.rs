//! Supervisor lifecycle phases.

use std::fmt;

use serde::Serialize;

/// Phase of one supervised component.
///
/// `Idle → Starting → Running → Stopping → Idle`. `Zombie` is observed when a
/// tracked process turns out to have exited, and is immediately folded back
/// into `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Idle,
    Starting,
    Running,
    Stopping,
    Zombie,
}

impl SupervisorState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Zombie => "zombie",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
