use serde_json::{Map, Value, json};

use super::SectionBuilder;
use crate::config::{DEFAULT_COVERAGE_EXCLUDES, DEFAULT_COVERAGE_REPORT_DIRECTORY};

/// Builder default also keeps spec files out of instrumentation.
const BUILDER_EXCLUDES: [&str; 1] = ["**.spec.js"];

/// Builds the `coverage` section.
#[derive(Debug, Clone)]
pub struct CoverageConfigBuilder {
    enabled: Option<bool>,
    report_directory: String,
    exclude_patterns: Vec<String>,
    engine_options: Value,
}

fn default_excludes() -> Vec<String> {
    DEFAULT_COVERAGE_EXCLUDES
        .iter()
        .chain(BUILDER_EXCLUDES.iter())
        .map(|pattern| pattern.to_string())
        .collect()
}

impl Default for CoverageConfigBuilder {
    fn default() -> Self {
        Self {
            enabled: None,
            report_directory: DEFAULT_COVERAGE_REPORT_DIRECTORY.to_string(),
            exclude_patterns: default_excludes(),
            engine_options: Value::Object(Map::new()),
        }
    }
}

impl CoverageConfigBuilder {
    pub fn enable(&mut self) -> &mut Self {
        self.set_enabled(true)
    }

    pub fn disable(&mut self) -> &mut Self {
        self.set_enabled(false)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = Some(enabled);
        self
    }

    /// Leave `enabled` to the defaults (`DISABLE_CODE_COVERAGE`).
    pub fn unset_enabled(&mut self) -> &mut Self {
        self.enabled = None;
        self
    }

    /// Directory name under `<report root>/<test type>`. `None` restores `coverage`.
    pub fn report_directory(&mut self, name: Option<&str>) -> &mut Self {
        self.report_directory = name.unwrap_or(DEFAULT_COVERAGE_REPORT_DIRECTORY).to_string();
        self
    }

    /// Replace the exclude patterns. `None` restores the defaults.
    pub fn exclude_patterns(&mut self, patterns: Option<&[&str]>) -> &mut Self {
        self.exclude_patterns = match patterns {
            Some(patterns) => patterns.iter().map(|pattern| pattern.to_string()).collect(),
            None => default_excludes(),
        };
        self
    }

    pub fn add_exclude_patterns(&mut self, patterns: &[&str]) -> &mut Self {
        self.exclude_patterns
            .extend(patterns.iter().map(|pattern| pattern.to_string()));
        self
    }

    /// Options merged over the coverage engine defaults. `None` restores `{}`.
    pub fn engine_options(&mut self, options: Option<Value>) -> &mut Self {
        self.engine_options = options.unwrap_or_else(|| Value::Object(Map::new()));
        self
    }
}

impl SectionBuilder for CoverageConfigBuilder {
    fn section_key(&self) -> &'static str {
        "coverage"
    }

    fn build(&self) -> Value {
        let mut section = json!({
            "excludes": self.exclude_patterns,
            "reportDirectory": self.report_directory,
            "engineOptions": self.engine_options
        });
        if let Some(enabled) = self.enabled {
            section["enabled"] = Value::Bool(enabled);
        }
        section
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}
