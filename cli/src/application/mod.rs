//! Application layer: port traits and the supervision services built on them.
//!
//! Depends only on `crate::domain`. Infrastructure is reached through ports.

pub mod ports;
pub mod services;

pub use ports::{
    Dispatcher, OutputSink, OutputStream, ProcessHandle, ProcessTable, ProgressReporter,
    SettingsStore, TopologySource,
};
