//! Stable exit codes reported in a [`RunReport`](crate::core::types::RunReport).
//!
//! A `postExecution` step may replace these with any value.

/// Tests passed and every phase succeeded.
pub const PASSED: i32 = 0;
/// Tests failed, or a phase or collaborator failed.
pub const FAILED: i32 = 1;
