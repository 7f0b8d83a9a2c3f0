//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces the infrastructure layer implements. Only
//! `crate::domain` and the shared settings crate are imported here.

use std::io::{self, Read};
use std::process::ExitStatus;

use chrono::{DateTime, Utc};
use tilewall_common::{ComponentKind, FleetSettings};

use crate::domain::{ClusterTopology, CommandLine, ConfigError, SpawnError, TopologyError};

// ── Process Ports ─────────────────────────────────────────────────────────────

/// Combined stdout and stderr of a spawned process.
pub type OutputStream = Box<dyn Read + Send>;

/// A spawned child process the supervisor keeps track of.
pub trait ProcessHandle: Send {
    fn pid(&self) -> u32;
    /// `Ok(None)` while the process is still running.
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    /// Block until the process exits.
    fn wait(&mut self) -> io::Result<ExitStatus>;
    /// Forcefully terminate the process.
    fn terminate(&mut self) -> io::Result<()>;
    /// Take the output stream. Returns `None` once taken. A read that finds
    /// no new output while the process runs fails with `WouldBlock`.
    fn take_output(&mut self) -> Option<OutputStream>;
}

/// Spawns processes on the local host. Remote work is expressed as a local
/// remote-shell invocation.
pub trait Dispatcher: Send + Sync {
    type Process: ProcessHandle;

    /// Spawn `cmd` as `kind`'s process, with stdin closed and stdout plus
    /// stderr merged into one stream. The process must outlive the launcher:
    /// it gets its own process group and its output never depends on the
    /// launcher staying alive.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` when the program is missing, not executable, or
    /// the working directory is unusable.
    fn run(&self, kind: ComponentKind, cmd: &CommandLine) -> Result<Self::Process, SpawnError>;

    /// Spawn `cmd` without keeping a handle and return its PID. The child is
    /// reaped in the background.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` when the process cannot be spawned.
    fn run_detached(&self, cmd: &CommandLine) -> Result<u32, SpawnError>;
}

// ── Output Port ───────────────────────────────────────────────────────────────

/// Receives decoded output chunks from output readers. Called from reader
/// threads, so implementations must be thread-safe.
pub trait OutputSink: Send + Sync {
    fn deliver(&self, kind: ComponentKind, text: &str);
}

// ── Settings and Topology Ports ───────────────────────────────────────────────

/// Abstracts persistence of the fleet settings.
pub trait SettingsStore {
    /// Load stored settings, returning `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the stored settings are unreadable or corrupt.
    fn load(&self) -> Result<Option<FleetSettings>, ConfigError>;

    /// Persist `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be written.
    fn save(&self, settings: &FleetSettings) -> anyhow::Result<()>;

    /// Human-readable location, for messages.
    fn location(&self) -> String;
}

/// Provides the cluster topology, re-read on every call.
pub trait TopologySource: Send + Sync {
    /// # Errors
    ///
    /// Returns `TopologyError` when the configuration cannot be read or parsed.
    fn load(&self) -> Result<ClusterTopology, TopologyError>;
}

/// Snapshot of the OS process table.
pub trait ProcessTable {
    /// Whether `pid` names a live, non-zombie process.
    fn is_running(&self, pid: u32) -> bool;

    /// When the process currently holding `pid` started, if known.
    fn started_at(&self, pid: u32) -> Option<DateTime<Utc>>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the presentation layer.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
