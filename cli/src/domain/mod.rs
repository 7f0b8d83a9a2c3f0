//! Domain layer: pure supervision logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs` or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod command;
pub mod config;
pub mod error;
pub mod hooks;
pub mod kill;
pub mod lifecycle;
pub mod output_buffer;
pub mod topology;

pub use command::{CommandBuilder, CommandLine, Layout, Platform, StopPolicy};
pub use error::{ConfigError, KillError, ReadError, SpawnError, SupervisorError, TopologyError};
pub use kill::{KillPlan, PlatformKiller};
pub use lifecycle::SupervisorState;
pub use output_buffer::OutputBuffer;
pub use topology::ClusterTopology;
