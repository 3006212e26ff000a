//! Configuration resolution: validate, layer, merge, normalize.
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. every recognized environment variable
//! 3. programmatic options
//! 4. environment variables for the keys where the environment wins

use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::config::schema::validate_options;
use crate::config::{Configuration, LaunchOptions, default_document};
use crate::core::merge::merge_layers;
use crate::core::path::absolutize;
use crate::error::ConfigError;
use crate::io::env::{Environment, env_overrides};

/// Resolve `options` against `env`. Nothing is applied on failure.
#[instrument(skip_all)]
pub fn resolve(options: &LaunchOptions, env: &Environment) -> Result<Configuration, ConfigError> {
    validate_options(&options.document)?;
    let overrides = env_overrides(env)?;
    let defaults = default_document(env);

    let merged = merge_layers([
        &defaults,
        &overrides.base,
        &options.document,
        &overrides.priority,
    ]);
    debug!(document = %merged, "merged configuration layers");

    let mut configuration: Configuration = serde_json::from_value(merged)?;
    configuration.project.root_directory_path =
        absolute(configuration.project.root_directory_path)?;
    if let Some(path) = configuration.reports.root_directory_path.take() {
        configuration.reports.root_directory_path = Some(absolute(path)?);
    }
    configuration.test.spec_file_filters = options.spec_file_filters.clone();
    Ok(configuration)
}

fn absolute(path: PathBuf) -> Result<PathBuf, ConfigError> {
    absolutize(&path).map_err(|source| ConfigError::Path { path, source })
}
