//! Shared deterministic types for the launcher lifecycle.
//!
//! These types define stable contracts between the controller, the step
//! pipeline and the configuration layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named point in the run lifecycle with its own ordered step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Before anything else, ahead of coverage instrumentation.
    PreLaunch,
    /// After coverage started, just before the test engine launches.
    PreTestLaunch,
    /// After the test engine reported completion.
    PostExecution,
    /// Teardown. Always executed, best effort.
    CleanUp,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 4] = [
        Phase::PreLaunch,
        Phase::PreTestLaunch,
        Phase::PostExecution,
        Phase::CleanUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::PreLaunch => "preLaunch",
            Phase::PreTestLaunch => "preTestLaunch",
            Phase::PostExecution => "postExecution",
            Phase::CleanUp => "cleanUp",
        }
    }

    /// Whether a failing step aborts the phase immediately.
    ///
    /// Setup phases abort so tests never run on a broken setup; reporting and
    /// teardown phases run every step and surface the first failure afterwards.
    pub fn stops_on_error(&self) -> bool {
        matches!(self, Phase::PreLaunch | Phase::PreTestLaunch)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current lifecycle state of a launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    #[default]
    None,
    Ready,
    Running,
    PostExecution,
    ShuttingDown,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::None => "none",
            RunState::Ready => "ready",
            RunState::Running => "running",
            RunState::PostExecution => "postExecution",
            RunState::ShuttingDown => "shuttingDown",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report formats the test engine can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    JunitXml,
    Html,
}

/// Terminal result handed back to the host once a run is over.
///
/// The launcher never exits the process itself; the host decides what to do
/// with `exit_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub state: RunState,
    pub exit_code: i32,
}
