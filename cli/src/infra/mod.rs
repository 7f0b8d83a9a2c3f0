//! Infrastructure layer: concrete implementations of the application ports.
//!
//! All process spawning, filesystem access and environment reading lives
//! here. Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod dispatcher;
pub mod process_table;
pub mod settings_store;
pub mod sinks;
pub mod topology;

pub use config::LauncherConfig;
pub use dispatcher::{OsDispatcher, OsProcess};
pub use process_table::SysinfoProcessTable;
pub use settings_store::YamlSettingsStore;
pub use sinks::{ChannelSink, DiscardSink, OutputEvent};
pub use topology::TileConfigSource;
