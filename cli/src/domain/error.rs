//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs` or `std::process`. All error
//! types implement `thiserror::Error` and convert to `anyhow::Error` via the
//! `?` operator.

use std::io;

use thiserror::Error;
use tilewall_common::ComponentKind;

// ── Process errors ────────────────────────────────────────────────────────────

/// A child process could not be created.
#[derive(Debug, Error)]
#[error("failed to spawn {program}: {source}")]
pub struct SpawnError {
    pub program: String,
    pub source: io::Error,
}

impl SpawnError {
    #[must_use]
    pub fn new(program: impl Into<String>, source: io::Error) -> Self {
        Self {
            program: program.into(),
            source,
        }
    }
}

/// Reading a component's output stream failed.
#[derive(Debug, Error)]
#[error("reading output of {kind}: {source}")]
pub struct ReadError {
    pub kind: ComponentKind,
    pub source: io::Error,
}

/// A kill or terminate command could not be dispatched.
#[derive(Debug, Error)]
#[error("stopping {kind} with {program}: {source}")]
pub struct KillError {
    pub kind: ComponentKind,
    pub program: String,
    pub source: io::Error,
}

impl KillError {
    #[must_use]
    pub fn from_spawn(kind: ComponentKind, err: SpawnError) -> Self {
        Self {
            kind,
            program: err.program,
            source: err.source,
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to settings and launcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting for {kind}: {key}\n\nValid settings: {valid}")]
    UnknownKey {
        kind: ComponentKind,
        key: String,
        valid: String,
    },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },

    #[error("Settings file {path} is unreadable: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Settings file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Settings stored under {slot} describe a {found} component")]
    KindMismatch {
        slot: ComponentKind,
        found: ComponentKind,
    },

    #[error("Launcher configuration: {0}")]
    Launcher(String),
}

// ── Topology errors ───────────────────────────────────────────────────────────

/// Errors reading the cluster tile configuration.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("no tileConfiguration line in the display service configuration")]
    MissingTileConfiguration,

    #[error("tile configuration line {line}: {reason}: {text}")]
    Malformed {
        line: usize,
        text: String,
        reason: &'static str,
    },
}

// ── Supervision ───────────────────────────────────────────────────────────────

/// Any failure a supervisor catches and logs instead of propagating.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Kill(#[from] KillError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
