pub mod kind;
pub mod settings;

pub use kind::{ComponentKind, UnknownKind};
pub use settings::{
    AppLauncherSettings, ComponentSettings, DisplayServiceSettings, FleetSettings, KindSettings,
    ProxySettings, UiSettings,
};
