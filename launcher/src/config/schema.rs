//! JSON Schema validation for option and environment documents.

use jsonschema::Draft;
use serde_json::Value;

use crate::error::ConfigError;

const OPTIONS_SCHEMA: &str = include_str!("../../schemas/options.schema.json");
const ENV_SCHEMA: &str = include_str!("../../schemas/env.schema.json");

/// One schema violation: JSON pointer into the instance plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

/// Validate a programmatic options document.
pub fn validate_options(instance: &Value) -> Result<(), ConfigError> {
    match violations("options", OPTIONS_SCHEMA, instance)?.into_iter().next() {
        Some(violation) => Err(ConfigError::Options {
            path: violation.path,
            message: violation.message,
        }),
        None => Ok(()),
    }
}

/// Validate an environment-derived document, returning every violation.
pub fn environment_violations(instance: &Value) -> Result<Vec<Violation>, ConfigError> {
    violations("environment", ENV_SCHEMA, instance)
}

/// Validate `instance` against an embedded schema (Draft 2020-12).
fn violations(
    document: &'static str,
    schema_raw: &str,
    instance: &Value,
) -> Result<Vec<Violation>, ConfigError> {
    let schema: Value = serde_json::from_str(schema_raw).map_err(|err| ConfigError::Schema {
        document,
        message: err.to_string(),
    })?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| ConfigError::Schema {
            document,
            message: err.to_string(),
        })?;
    Ok(compiled
        .iter_errors(instance)
        .map(|err| Violation {
            path: pointer_or_root(err.instance_path().as_str()),
            message: err.to_string(),
        })
        .collect())
}

fn pointer_or_root(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
