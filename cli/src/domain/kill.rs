//! Platform kill capability.
//!
//! POSIX hosts force-kill the display service on every cluster node through
//! the remote shell and signal single PIDs with `kill -9`. Windows hosts have
//! no remote shell, so the same name list is force-terminated locally with
//! `taskkill`. The killer is chosen once, when the command builder is made.

use std::sync::Arc;

use crate::domain::command::{CommandLine, Platform};

/// Loopback node that is always part of a cluster-wide kill.
pub const LOOPBACK: &str = "127.0.0.1";

/// What stopping a component dispatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillPlan {
    /// One remote-shell command per cluster node.
    Remote(Vec<CommandLine>),
    /// A single command on this host.
    Local(CommandLine),
    /// No built command. The supervisor signals the PID it tracks.
    SignalTrackedPid,
}

impl KillPlan {
    /// Commands to dispatch, in order.
    #[must_use]
    pub fn commands(&self) -> &[CommandLine] {
        match self {
            KillPlan::Remote(cmds) => cmds,
            KillPlan::Local(cmd) => std::slice::from_ref(cmd),
            KillPlan::SignalTrackedPid => &[],
        }
    }
}

pub trait PlatformKiller: Send + Sync {
    /// Whether `kill_by_name` reaches remote hosts. When `false` the cluster
    /// topology is not needed.
    fn targets_hosts(&self) -> bool;

    /// Force-kill every process named in `names` across the cluster `hosts`.
    fn kill_by_name(&self, hosts: &[String], names: &[&str]) -> KillPlan;

    /// Force-terminate a single local PID.
    fn kill_pid(&self, pid: u32) -> CommandLine;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PosixKiller;

impl PlatformKiller for PosixKiller {
    fn targets_hosts(&self) -> bool {
        true
    }

    fn kill_by_name(&self, hosts: &[String], names: &[&str]) -> KillPlan {
        let remote = format!("/usr/bin/killall -9 {}", names.join(" "));
        let cmds = hosts
            .iter()
            .map(|host| {
                CommandLine::new("/usr/bin/ssh")
                    .arg("-fx")
                    .arg(host.clone())
                    .arg(remote.clone())
            })
            .collect();
        KillPlan::Remote(cmds)
    }

    fn kill_pid(&self, pid: u32) -> CommandLine {
        CommandLine::new("/bin/kill").arg("-9").arg(pid.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsKiller;

impl PlatformKiller for WindowsKiller {
    fn targets_hosts(&self) -> bool {
        false
    }

    fn kill_by_name(&self, _hosts: &[String], names: &[&str]) -> KillPlan {
        let cmd = names.iter().fold(CommandLine::new("taskkill").arg("/F"), |cmd, name| {
            cmd.arg("/IM").arg(format!("{name}.exe"))
        });
        KillPlan::Local(cmd)
    }

    fn kill_pid(&self, pid: u32) -> CommandLine {
        CommandLine::new("taskkill")
            .arg("/F")
            .arg("/PID")
            .arg(pid.to_string())
    }
}

#[must_use]
pub fn killer_for(platform: Platform) -> Arc<dyn PlatformKiller> {
    match platform {
        Platform::Posix => Arc::new(PosixKiller),
        Platform::Windows => Arc::new(WindowsKiller),
    }
}
