//! Environment snapshot and environment-derived configuration overrides.
//!
//! The launcher never reads `std::env` behind the caller's back: resolution
//! works on an [`Environment`] value, usually captured once with
//! [`Environment::from_process`].

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::schema::environment_violations;
use crate::error::ConfigError;

pub const CONFIG_PROJECT_ROOT_DIR_PATH: &str = "CONFIG_PROJECT_ROOT_DIR_PATH";
pub const CONFIG_REPORTS_ROOT_DIR_PATH: &str = "CONFIG_REPORTS_ROOT_DIR_PATH";
pub const CONFIG_COVERAGE_ENABLED: &str = "CONFIG_COVERAGE_ENABLED";
pub const CONFIG_COVERAGE_EXCLUDES: &str = "CONFIG_COVERAGE_EXCLUDES";
pub const CONFIG_COVERAGE_REPORT_DIR_NAME: &str = "CONFIG_COVERAGE_REPORT_DIR_NAME";
pub const CONFIG_TEST_TYPE: &str = "CONFIG_TEST_TYPE";
pub const CONFIG_TEST_SPEC_DIR_PATH: &str = "CONFIG_TEST_SPEC_DIR_PATH";
pub const CONFIG_TEST_ENABLE_REPORT_JUNIT: &str = "CONFIG_TEST_ENABLE_REPORT_JUNIT";
pub const CONFIG_TEST_ENABLE_REPORT_HTML: &str = "CONFIG_TEST_ENABLE_REPORT_HTML";
/// When set, coverage defaults to disabled.
pub const DISABLE_CODE_COVERAGE: &str = "DISABLE_CODE_COVERAGE";
/// When set, the spec directory defaults to the project root.
pub const ENABLE_DEVELOPER_MODE: &str = "ENABLE_DEVELOPER_MODE";

/// Immutable snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Value of `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Text,
    Flag,
    List,
}

/// Maps one environment variable onto a configuration key.
struct Binding {
    var: &'static str,
    pointer: &'static [&'static str],
    kind: ValueKind,
    /// Environment beats programmatic options for this key.
    overrides_programmatic: bool,
}

const BINDINGS: [Binding; 9] = [
    Binding {
        var: CONFIG_PROJECT_ROOT_DIR_PATH,
        pointer: &["project", "rootDirectoryPath"],
        kind: ValueKind::Text,
        overrides_programmatic: false,
    },
    Binding {
        var: CONFIG_REPORTS_ROOT_DIR_PATH,
        pointer: &["reports", "rootDirectoryPath"],
        kind: ValueKind::Text,
        overrides_programmatic: false,
    },
    Binding {
        var: CONFIG_COVERAGE_ENABLED,
        pointer: &["coverage", "enabled"],
        kind: ValueKind::Flag,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_COVERAGE_EXCLUDES,
        pointer: &["coverage", "excludes"],
        kind: ValueKind::List,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_COVERAGE_REPORT_DIR_NAME,
        pointer: &["coverage", "reportDirectory"],
        kind: ValueKind::Text,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_TEST_TYPE,
        pointer: &["test", "type"],
        kind: ValueKind::Text,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_TEST_SPEC_DIR_PATH,
        pointer: &["test", "specDirPath"],
        kind: ValueKind::Text,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_TEST_ENABLE_REPORT_JUNIT,
        pointer: &["test", "reports", "junitXml"],
        kind: ValueKind::Flag,
        overrides_programmatic: true,
    },
    Binding {
        var: CONFIG_TEST_ENABLE_REPORT_HTML,
        pointer: &["test", "reports", "html"],
        kind: ValueKind::Flag,
        overrides_programmatic: true,
    },
];

/// Environment-derived configuration, split by precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvOverrides {
    /// Every recognized variable. Sits between defaults and programmatic options.
    pub base: Value,
    /// Only the keys where the environment beats programmatic options.
    pub priority: Value,
}

/// Build and validate the environment-derived configuration documents.
pub fn env_overrides(env: &Environment) -> Result<EnvOverrides, ConfigError> {
    let mut base = Value::Object(Map::new());
    let mut priority = Value::Object(Map::new());

    for binding in &BINDINGS {
        let Some(raw) = env.get(binding.var) else {
            continue;
        };
        let Some(value) = parse_value(raw, binding.kind) else {
            continue;
        };
        debug!(var = binding.var, "environment override present");
        insert_at(&mut base, binding.pointer, value.clone());
        if binding.overrides_programmatic {
            insert_at(&mut priority, binding.pointer, value);
        }
    }

    if let Some(violation) = environment_violations(&base)?.into_iter().next() {
        let var = variable_for_pointer(&violation.path).unwrap_or("<unknown>");
        return Err(ConfigError::Environment {
            var: var.to_string(),
            path: violation.path,
            message: violation.message,
        });
    }

    Ok(EnvOverrides { base, priority })
}

fn parse_value(raw: &str, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Text => Some(Value::String(raw.to_string())),
        // Unrecognized flags stay strings so schema validation reports them.
        ValueKind::Flag => Some(parse_flag(raw).map_or_else(
            || Value::String(raw.to_string()),
            Value::Bool,
        )),
        ValueKind::List => {
            let items: Vec<Value> = raw
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(Value::Array(items))
            }
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn insert_at(doc: &mut Value, pointer: &[&str], value: Value) {
    let Some((last, parents)) = pointer.split_last() else {
        return;
    };
    let mut cursor = doc;
    for key in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        cursor = match cursor {
            Value::Object(map) => map
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }
    if let Value::Object(map) = cursor {
        map.insert((*last).to_string(), value);
    }
}

fn variable_for_pointer(path: &str) -> Option<&'static str> {
    BINDINGS
        .iter()
        .find(|binding| {
            let pointer = format!("/{}", binding.pointer.join("/"));
            path == pointer || path.starts_with(&format!("{pointer}/"))
        })
        .map(|binding| binding.var)
}
