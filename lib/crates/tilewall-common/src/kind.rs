use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the five supervised roles of a display-wall fleet.
///
/// Declaration order is fleet order. The display service comes first because
/// the other components expect its control socket to be listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum), value(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Primary display service (the wall's compositor and control socket).
    DisplayService,
    /// Application launcher.
    AppLauncher,
    /// Operator UI.
    Ui,
    /// File server.
    FileServer,
    /// Proxy in front of the display service.
    Proxy,
}

impl ComponentKind {
    /// All kinds in fleet order.
    pub const ALL: [ComponentKind; 5] = [
        ComponentKind::DisplayService,
        ComponentKind::AppLauncher,
        ComponentKind::Ui,
        ComponentKind::FileServer,
        ComponentKind::Proxy,
    ];

    /// Stable identifier, identical to the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::DisplayService => "display_service",
            ComponentKind::AppLauncher => "app_launcher",
            ComponentKind::Ui => "ui",
            ComponentKind::FileServer => "file_server",
            ComponentKind::Proxy => "proxy",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::DisplayService => "Display Service",
            ComponentKind::AppLauncher => "Application Launcher",
            ComponentKind::Ui => "UI",
            ComponentKind::FileServer => "File Server",
            ComponentKind::Proxy => "Proxy",
        }
    }

    /// Whether this is the primary service the rest of the fleet waits on.
    #[must_use]
    pub fn is_primary(self) -> bool {
        self == ComponentKind::DisplayService
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown component '{0}' (expected one of: display_service, app_launcher, ui, file_server, proxy)")]
pub struct UnknownKind(pub String);

impl FromStr for ComponentKind {
    type Err = UnknownKind;

    /// Accepts the snake_case identifier or its kebab-case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ComponentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
