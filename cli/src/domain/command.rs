//! Start-command construction for every component kind.
//!
//! Pure functions only. The builder turns a settings record plus the install
//! layout into an argv and a working directory. Nothing here touches the
//! process table or the filesystem.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tilewall_common::{ComponentKind, ComponentSettings, KindSettings};

use crate::domain::kill::{KillPlan, PlatformKiller, killer_for};

/// Host family the launcher runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// Platform of the running binary.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

/// A program, its discrete arguments and an optional working directory.
///
/// Arguments are never shell-interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program followed by its arguments.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Split one hook-script line on whitespace. No quoting is honoured, so an
    /// argument containing spaces cannot be expressed.
    ///
    /// Returns `None` for a blank line.
    #[must_use]
    pub fn from_hook_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let program = tokens.next()?;
        Some(Self::new(program).args(tokens))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Where the display-wall software is installed and which interpreter runs
/// its scripted components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub interpreter: String,
}

impl Layout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, interpreter: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            interpreter: interpreter.into(),
        }
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Working directory of `kind`.
    #[must_use]
    pub fn cwd(&self, kind: ComponentKind) -> PathBuf {
        match kind {
            ComponentKind::DisplayService => self.bin_dir(),
            ComponentKind::AppLauncher => self.bin_dir().join("appLauncher"),
            ComponentKind::FileServer => self.bin_dir().join("fileServer"),
            ComponentKind::Proxy => self.bin_dir().join("sageProxy"),
            ComponentKind::Ui => self.root.join("ui"),
        }
    }
}

/// How `stop()` decides whether to act on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Dispatch the kill plan even when nothing is tracked as alive. These
    /// kinds are routinely started outside this launcher or run on remote
    /// hosts a local handle cannot see.
    Unconditional,
    /// Signal only a process tracked as alive, so a reused PID is never hit.
    WhenAlive,
}

impl StopPolicy {
    #[must_use]
    pub fn for_kind(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::DisplayService | ComponentKind::AppLauncher => Self::Unconditional,
            ComponentKind::Ui | ComponentKind::FileServer | ComponentKind::Proxy => {
                Self::WhenAlive
            }
        }
    }
}

/// Builds start commands and kill plans for one platform.
#[derive(Clone)]
pub struct CommandBuilder {
    layout: Layout,
    platform: Platform,
    killer: Arc<dyn PlatformKiller>,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("layout", &self.layout)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl CommandBuilder {
    #[must_use]
    pub fn new(layout: Layout, platform: Platform) -> Self {
        Self {
            layout,
            platform,
            killer: killer_for(platform),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn killer(&self) -> &dyn PlatformKiller {
        self.killer.as_ref()
    }

    fn script(&self, relative: &Path) -> CommandLine {
        CommandLine::new(self.layout.interpreter.clone())
            .arg("-u")
            .arg(self.layout.root.join(relative).to_string_lossy())
    }

    /// Trailing `&` for components configured to run in the background.
    /// Only POSIX launches carry it.
    fn background_marker(&self, settings: &ComponentSettings) -> Option<&'static str> {
        (settings.run_in_background && self.platform == Platform::Posix).then_some("&")
    }

    /// Argv and working directory that start the component described by
    /// `settings`.
    #[must_use]
    pub fn start_command(&self, settings: &ComponentSettings) -> CommandLine {
        let kind = settings.kind();
        let cmd = match &settings.details {
            KindSettings::DisplayService(_) => CommandLine::new("fsManager"),
            KindSettings::AppLauncher(launcher) => {
                let cmd = self
                    .script(Path::new("bin/appLauncher/appLauncher.py"))
                    .arg("-v")
                    .arg("-p")
                    .arg(launcher.port.to_string());
                let cmd = if launcher.report {
                    cmd.arg("-s").arg(launcher.report_server.clone())
                } else {
                    cmd.arg("-n")
                };
                cmd.args(self.background_marker(settings))
            }
            KindSettings::FileServer => self
                .script(Path::new("bin/fileServer/fileServer.py"))
                .arg("-v")
                .args(self.background_marker(settings)),
            KindSettings::Proxy(proxy) => self
                .script(Path::new("bin/sageProxy/sageProxy.py"))
                .arg("-s")
                .arg(proxy.host.clone())
                .arg("-p")
                .arg(proxy.port.to_string())
                .arg("-x")
                .arg(proxy.password.clone())
                .arg("-v"),
            KindSettings::Ui(ui) => {
                let mut cmd = self
                    .script(Path::new("ui/sageui.py"))
                    .arg("-v")
                    .arg("-s")
                    .arg(ui.host.clone())
                    .arg("-p")
                    .arg(ui.port.to_string())
                    .arg("-t");
                if let Some(machine) = &ui.autologin {
                    cmd = cmd.arg("-a").arg(machine.clone());
                }
                if let Some(state) = &ui.saved_state {
                    cmd = cmd.arg("-o").arg(state.clone());
                }
                cmd
            }
        };
        cmd.current_dir(self.layout.cwd(kind))
    }

    /// Kill plan for the component described by `settings`.
    ///
    /// `hosts` are the cluster nodes targeted when stopping the display
    /// service. Other kinds ignore it.
    #[must_use]
    pub fn kill_plan(&self, settings: &ComponentSettings, hosts: &[String]) -> KillPlan {
        match &settings.details {
            KindSettings::DisplayService(display) => {
                self.killer.kill_by_name(hosts, &display.kill_list())
            }
            KindSettings::AppLauncher(launcher) => KillPlan::Local(
                CommandLine::new(self.layout.interpreter.clone())
                    .arg("KILL_LAUNCHER.py")
                    .arg(launcher.port.to_string())
                    .current_dir(self.layout.cwd(ComponentKind::AppLauncher)),
            ),
            KindSettings::Ui(_) | KindSettings::FileServer | KindSettings::Proxy(_) => {
                KillPlan::SignalTrackedPid
            }
        }
    }
}
