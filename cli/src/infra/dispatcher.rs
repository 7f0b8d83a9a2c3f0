//! Infrastructure implementation of the `Dispatcher` port.
//!
//! `OsDispatcher` spawns with `std::process`. A supervised process writes
//! stdout and stderr into one log file per component, and the launcher tails
//! that file. The child never holds a pipe back to the launcher, so it keeps
//! running and writing after the launcher exits. Each supervised process also
//! leads its own process group, so a Ctrl-C at the launcher's terminal does
//! not reach it. Detached processes are reaped by a waiter thread so no
//! defunct entries pile up.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tilewall_common::ComponentKind;

use crate::application::ports::{Dispatcher, OutputStream, ProcessHandle};
use crate::domain::{CommandLine, SpawnError};

/// `CREATE_NEW_PROCESS_GROUP` from the Win32 process creation flags.
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Production `Dispatcher` using the host's process API.
#[derive(Debug, Clone)]
pub struct OsDispatcher {
    log_dir: PathBuf,
}

impl OsDispatcher {
    /// Dispatcher writing component logs under `log_dir`. The directory is
    /// created on the first spawn.
    #[must_use]
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Log file receiving `kind`'s output. Truncated on every start.
    #[must_use]
    pub fn log_path(&self, kind: ComponentKind) -> PathBuf {
        self.log_dir.join(format!("{kind}.log"))
    }
}

fn command_for(cmd: &CommandLine) -> Command {
    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args).stdin(Stdio::null());
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }
    command
}

fn own_process_group(command: &mut Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
}

fn create_log(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Wait for `child` on a background thread.
fn reap_in_background(mut child: Child) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || {
            if let Err(e) = child.wait() {
                tracing::debug!(pid, error = %e, "waiting for detached child failed");
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(pid, error = %e, "cannot spawn reaper thread");
    }
}

impl Dispatcher for OsDispatcher {
    type Process = OsProcess;

    fn run(&self, kind: ComponentKind, cmd: &CommandLine) -> Result<OsProcess, SpawnError> {
        let spawn_err = |e: io::Error| SpawnError::new(cmd.program.clone(), e);
        let path = self.log_path(kind);
        let stdout = create_log(&path).map_err(spawn_err)?;
        let stderr = stdout.try_clone().map_err(spawn_err)?;
        let tail = File::open(&path).map_err(spawn_err)?;

        let mut command = command_for(cmd);
        command.stdout(stdout).stderr(stderr);
        own_process_group(&mut command);
        let child = command.spawn().map_err(spawn_err)?;

        tracing::debug!(pid = child.id(), command = %cmd, log = %path.display(), "spawned");
        let done = Arc::new(AtomicBool::new(false));
        Ok(OsProcess {
            child: Some(child),
            output: Some(LogTail {
                file: tail,
                done: Arc::clone(&done),
            }),
            done,
        })
    }

    fn run_detached(&self, cmd: &CommandLine) -> Result<u32, SpawnError> {
        let child = command_for(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpawnError::new(cmd.program.clone(), e))?;
        let pid = child.id();
        tracing::debug!(pid, command = %cmd, "spawned detached");
        reap_in_background(child);
        Ok(pid)
    }
}

/// Reads a component log while its process writes it.
///
/// An empty read while the process may still write fails with `WouldBlock`.
/// Once the process has exited an empty read is end of stream.
#[derive(Debug)]
pub struct LogTail {
    file: File,
    done: Arc<AtomicBool>,
}

impl Read for LogTail {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Checked before reading: every write happened before the exit that
        // set the flag, so an empty read after it is the real end.
        let done = self.done.load(Ordering::Acquire);
        match self.file.read(buf)? {
            0 if done => Ok(0),
            0 => Err(io::ErrorKind::WouldBlock.into()),
            n => Ok(n),
        }
    }
}

/// A supervised child process.
#[derive(Debug)]
pub struct OsProcess {
    child: Option<Child>,
    output: Option<LogTail>,
    done: Arc<AtomicBool>,
}

impl OsProcess {
    fn exited(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn mark_exited(&self) {
        self.done.store(true, Ordering::Release);
    }
}

fn gone() -> io::Error {
    io::Error::other("process handle already released")
}

impl ProcessHandle for OsProcess {
    fn pid(&self) -> u32 {
        self.child.as_ref().map_or(0, Child::id)
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let child = self.child.as_mut().ok_or_else(gone)?;
        let status = child.try_wait()?;
        if status.is_some() {
            self.mark_exited();
        }
        Ok(status)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        let child = self.child.as_mut().ok_or_else(gone)?;
        let status = child.wait()?;
        self.mark_exited();
        Ok(status)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.child.as_mut().ok_or_else(gone)?.kill()
    }

    fn take_output(&mut self) -> Option<OutputStream> {
        self.output
            .take()
            .map(|tail| Box::new(tail) as OutputStream)
    }
}

impl Drop for OsProcess {
    /// Dropping a handle never kills the process, but a child that is still
    /// running is handed to a reaper so it does not linger as a zombie once
    /// it exits. A tail still reading the log ends at its current end.
    fn drop(&mut self) {
        let exited = self.exited();
        self.mark_exited();
        if exited {
            return;
        }
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => reap_in_background(child),
            }
        }
    }
}
