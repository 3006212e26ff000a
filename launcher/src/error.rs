//! Error taxonomy for the launcher.
//!
//! Library-level failures are typed so callers can tell a bad configuration
//! from a failing step. Errors raised by user code (steps, filter predicates,
//! engines) travel as [`anyhow::Error`] inside these variants.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{Phase, RunState};

/// Configuration could not be resolved. Nothing was applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid options at '{path}': {message}")]
    Options { path: String, message: String },
    #[error("invalid environment variable {var} (at '{path}'): {message}")]
    Environment {
        var: String,
        path: String,
        message: String,
    },
    #[error("invalid {document} schema: {message}")]
    Schema {
        document: &'static str,
        message: String,
    },
    #[error("deserialize resolved configuration: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("resolve path {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("read options file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse options file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A lifecycle transition was requested from the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("launcher not ready (state: {state})")]
    NotReady { state: RunState },
    #[error("cannot configure while {state}")]
    Busy { state: RunState },
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },
}

/// A step of a phase failed.
#[derive(Debug, Error)]
#[error("{phase} step #{index}{} failed: {error:#}", describe_name(.name.as_deref()))]
pub struct StepError {
    pub phase: Phase,
    pub index: usize,
    pub name: Option<String>,
    pub error: anyhow::Error,
}

fn describe_name(name: Option<&str>) -> String {
    name.map(|name| format!(" ({name})")).unwrap_or_default()
}

/// The spec-file filter chain could not be built or evaluated.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("spec file filter #{index} is not a valid pattern '{literal}': {source}")]
    InvalidLiteral {
        index: usize,
        literal: String,
        #[source]
        source: regex::Error,
    },
    #[error("spec file filter #{index} failed on '{path}': {error:#}")]
    Filter {
        index: usize,
        path: String,
        error: anyhow::Error,
    },
}

/// Umbrella error returned by the launcher facade.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("test engine failed: {0:#}")]
    Engine(anyhow::Error),
    #[error("coverage engine failed: {0:#}")]
    Coverage(anyhow::Error),
    #[error("test engine dropped its completion handle without reporting an outcome")]
    EngineDisconnected,
}

pub type Result<T, E = LaunchError> = std::result::Result<T, E>;
