//! Embeddable test-run launcher.
//!
//! The launcher resolves a layered configuration, drives the lifecycle
//! phases (`preLaunch`, `preTestLaunch`, `postExecution`, `cleanUp`) around
//! an external test engine and an optional coverage engine, filters spec
//! files, and reports an exit code back to its host. The architecture keeps
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (lifecycle transitions, merging,
//!   path normalization). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting collaborators (environment, files, engines).
//!   Behind traits so tests can script them.
//!
//! Orchestration modules ([`config`], [`step`], [`filter`], [`launcher`])
//! combine the two. [`builder`] assembles options fluently.

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod filter;
pub mod io;
pub mod launcher;
pub mod logging;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::builder::ConfigBuilder;
pub use crate::config::{Configuration, LaunchOptions};
pub use crate::core::types::{Phase, RunReport, RunState};
pub use crate::error::LaunchError;
pub use crate::launcher::Launcher;
pub use crate::step::{Step, StepContext, StepOutcome};
