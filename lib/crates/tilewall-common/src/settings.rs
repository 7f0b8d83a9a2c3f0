//! Per-component run settings and the fleet-wide settings record.
//!
//! The serialized shape is a map keyed by component kind. Each entry carries
//! the common fields plus a `kind` tag selecting its kind-specific fields.
//! Kinds missing from a stored file fall back to their defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::ComponentKind;

/// Run settings of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSettings {
    /// Leave the process running across a fleet-wide stop.
    #[serde(default)]
    pub run_in_background: bool,
    /// Start this component when the whole fleet is started.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// PID of the process believed alive. `None` once supervision concludes
    /// the process is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_pid: Option<u32>,
    /// When the tracked process was started. Cleared with the PID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    /// PIDs of pre-start hook commands, terminated at the next stop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hook_pids: Vec<u32>,
    #[serde(flatten)]
    pub details: KindSettings,
}

fn enabled_by_default() -> bool {
    true
}

impl ComponentSettings {
    /// First-run settings for `kind`.
    #[must_use]
    pub fn defaults(kind: ComponentKind) -> Self {
        Self {
            run_in_background: false,
            enabled: true,
            last_known_pid: None,
            last_started_at: None,
            hook_pids: Vec::new(),
            details: KindSettings::defaults(kind),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.details.kind()
    }

    /// Record a freshly started process.
    pub fn track(&mut self, pid: u32, started_at: DateTime<Utc>) {
        self.last_known_pid = Some(pid);
        self.last_started_at = Some(started_at);
    }

    /// Forget the tracked process. Hook PIDs are kept until a stop.
    pub fn untrack(&mut self) {
        self.last_known_pid = None;
        self.last_started_at = None;
    }

    /// Copy the fields owned by supervision (tracked PID, start time and hook
    /// PIDs) from `other`, leaving the user-editable fields alone.
    pub fn adopt_tracking(&mut self, other: &ComponentSettings) {
        self.last_known_pid = other.last_known_pid;
        self.last_started_at = other.last_started_at;
        self.hook_pids.clone_from(&other.hook_pids);
    }
}

/// Kind-specific settings, tagged with the component kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindSettings {
    DisplayService(DisplayServiceSettings),
    AppLauncher(AppLauncherSettings),
    Ui(UiSettings),
    FileServer,
    Proxy(ProxySettings),
}

impl KindSettings {
    #[must_use]
    pub fn defaults(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::DisplayService => {
                KindSettings::DisplayService(DisplayServiceSettings::default())
            }
            ComponentKind::AppLauncher => KindSettings::AppLauncher(AppLauncherSettings::default()),
            ComponentKind::Ui => KindSettings::Ui(UiSettings::default()),
            ComponentKind::FileServer => KindSettings::FileServer,
            ComponentKind::Proxy => KindSettings::Proxy(ProxySettings::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        match self {
            KindSettings::DisplayService(_) => ComponentKind::DisplayService,
            KindSettings::AppLauncher(_) => ComponentKind::AppLauncher,
            KindSettings::Ui(_) => ComponentKind::Ui,
            KindSettings::FileServer => ComponentKind::FileServer,
            KindSettings::Proxy(_) => ComponentKind::Proxy,
        }
    }
}

/// Primary display service: hook scripts and the per-node kill list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayServiceSettings {
    /// Newline-separated commands run before start. `#` lines are skipped.
    pub on_start: String,
    /// Newline-separated commands run after stop.
    pub on_stop: String,
    /// Space-separated process names force-killed on every node at stop.
    pub kill_names: String,
}

impl Default for DisplayServiceSettings {
    fn default() -> Self {
        Self {
            on_start: "xhost +local:\npython ../dim/dim.py\npython ../dim/hwcapture/localPointer.py localhost"
                .to_string(),
            on_stop: "fuser -k 19010/tcp".to_string(),
            kill_names: "fsManager sageDisplayManager sageAudioManager svc imageviewer mplayer \
                         bplay bplay-noglut VNCViewer render atlantis atlantis-mpi checker \
                         pdfviewer sagepdf"
                .to_string(),
        }
    }
}

impl DisplayServiceSettings {
    /// Process names from `kill_names`.
    #[must_use]
    pub fn kill_list(&self) -> Vec<&str> {
        self.kill_names.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppLauncherSettings {
    /// Announce this launcher to a public report server.
    pub report: bool,
    pub report_server: String,
    pub port: u16,
}

impl Default for AppLauncherSettings {
    fn default() -> Self {
        Self {
            report: false,
            report_server: "sage.sl.startap.net".to_string(),
            port: 19010,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 20001,
            password: "pass".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub host: String,
    pub port: u16,
    /// Machine to log into automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autologin: Option<String>,
    /// Saved session to restore on connect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_state: Option<String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            host: "sage.sl.startap.net".to_string(),
            port: 15558,
            autologin: None,
            saved_state: None,
        }
    }
}

/// Settings of the whole fleet, one record per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSettings {
    #[serde(default = "defaults::display_service")]
    pub display_service: ComponentSettings,
    #[serde(default = "defaults::app_launcher")]
    pub app_launcher: ComponentSettings,
    #[serde(default = "defaults::ui")]
    pub ui: ComponentSettings,
    #[serde(default = "defaults::file_server")]
    pub file_server: ComponentSettings,
    #[serde(default = "defaults::proxy")]
    pub proxy: ComponentSettings,
}

mod defaults {
    use super::{ComponentKind, ComponentSettings};

    pub fn display_service() -> ComponentSettings {
        ComponentSettings::defaults(ComponentKind::DisplayService)
    }
    pub fn app_launcher() -> ComponentSettings {
        ComponentSettings::defaults(ComponentKind::AppLauncher)
    }
    pub fn ui() -> ComponentSettings {
        ComponentSettings::defaults(ComponentKind::Ui)
    }
    pub fn file_server() -> ComponentSettings {
        ComponentSettings::defaults(ComponentKind::FileServer)
    }
    pub fn proxy() -> ComponentSettings {
        ComponentSettings::defaults(ComponentKind::Proxy)
    }
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            display_service: defaults::display_service(),
            app_launcher: defaults::app_launcher(),
            ui: defaults::ui(),
            file_server: defaults::file_server(),
            proxy: defaults::proxy(),
        }
    }
}

impl FleetSettings {
    #[must_use]
    pub fn get(&self, kind: ComponentKind) -> &ComponentSettings {
        match kind {
            ComponentKind::DisplayService => &self.display_service,
            ComponentKind::AppLauncher => &self.app_launcher,
            ComponentKind::Ui => &self.ui,
            ComponentKind::FileServer => &self.file_server,
            ComponentKind::Proxy => &self.proxy,
        }
    }

    pub fn get_mut(&mut self, kind: ComponentKind) -> &mut ComponentSettings {
        match kind {
            ComponentKind::DisplayService => &mut self.display_service,
            ComponentKind::AppLauncher => &mut self.app_launcher,
            ComponentKind::Ui => &mut self.ui,
            ComponentKind::FileServer => &mut self.file_server,
            ComponentKind::Proxy => &mut self.proxy,
        }
    }

    /// Replace the record for the record's own kind.
    pub fn set(&mut self, settings: ComponentSettings) {
        let kind = settings.kind();
        *self.get_mut(kind) = settings;
    }

    /// Records in fleet order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentSettings> {
        ComponentKind::ALL.into_iter().map(|k| self.get(k))
    }

    /// Kinds whose stored `kind` tag disagrees with the slot they are stored in.
    #[must_use]
    pub fn mismatched_kinds(&self) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .filter(|&k| self.get(k).kind() != k)
            .collect()
    }
}
