//! Side-effecting collaborators: environment, files and external engines.

pub mod coverage;
pub mod engine;
pub mod env;
pub mod options_file;
