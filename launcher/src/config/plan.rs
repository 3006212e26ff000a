//! Engine-facing plans derived from a resolved configuration.

use std::path::PathBuf;

use serde_json::{Value, json};

use crate::config::Configuration;
use crate::core::merge::merge_layers;
use crate::core::types::ReportKind;

/// Spec-file globs searched inside the spec directory.
pub const DEFAULT_SPEC_FILES: [&str; 2] = ["**/*[sS]pec.js", "*[sS]pec.js"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterOutput {
    pub kind: ReportKind,
    pub output_dir: PathBuf,
}

/// What the test engine needs to discover and run specs.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub project_root: PathBuf,
    pub spec_dir: PathBuf,
    pub spec_files: Vec<String>,
    pub reporters: Vec<ReporterOutput>,
    /// Engine defaults merged with `test.engineOptions`.
    pub options: Value,
}

impl TestPlan {
    pub fn from_configuration(config: &Configuration) -> Self {
        let spec_dir = config.spec_dir();
        let defaults = json!({
            "spec_dir": spec_dir.display().to_string(),
            "spec_files": DEFAULT_SPEC_FILES,
            "stopSpecOnExpectationFailure": false,
            "random": false
        });
        let options = merge_layers([&defaults, &config.test.engine_options]);
        let spec_files = options
            .get("spec_files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_SPEC_FILES.map(str::to_string).to_vec());

        Self {
            project_root: config.project_root().to_path_buf(),
            spec_dir,
            spec_files,
            reporters: config.reporters(),
            options,
        }
    }
}

/// What the coverage engine needs to instrument and report.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSettings {
    pub root: PathBuf,
    pub excludes: Vec<String>,
    pub report_dir: PathBuf,
    /// Engine defaults merged with `coverage.engineOptions`.
    pub options: Value,
}

impl CoverageSettings {
    pub fn from_configuration(config: &Configuration) -> Self {
        let root = config.project_root().to_path_buf();
        let report_dir = config.coverage_report_dir();
        let dir = report_dir.display().to_string();
        let defaults = json!({
            "instrumentation": {
                "root": root.display().to_string(),
                "excludes": config.coverage.excludes
            },
            "reporting": {"print": "summary", "dir": dir},
            "reports": ["lcov"],
            "dir": dir
        });
        let options = merge_layers([&defaults, &config.coverage.engine_options]);

        Self {
            root,
            excludes: config.coverage.excludes.clone(),
            report_dir,
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::configuration;

    #[test]
    fn test_plan_merges_engine_options_over_defaults() {
        let mut config = configuration("/repo");
        config.test.engine_options = json!({"random": true, "stopSpecOnExpectationFailure": null});
        let plan = TestPlan::from_configuration(&config);
        assert_eq!(plan.options["random"], Value::Bool(true));
        assert_eq!(plan.options["stopSpecOnExpectationFailure"], Value::Bool(false));
        assert_eq!(plan.options["spec_dir"], Value::from("test/unit"));
        assert_eq!(plan.spec_files, vec!["**/*[sS]pec.js", "*[sS]pec.js"]);
        assert_eq!(plan.reporters.len(), 2);
    }

    #[test]
    fn test_plan_spec_files_can_be_overridden() {
        let mut config = configuration("/repo");
        config.test.engine_options = json!({"spec_files": ["only/*.spec.js"]});
        let plan = TestPlan::from_configuration(&config);
        assert_eq!(plan.spec_files, vec!["only/*.spec.js"]);
    }

    #[test]
    fn coverage_settings_point_at_report_dir() {
        let mut config = configuration("/repo");
        config.coverage.engine_options = json!({"reporting": {"print": "detail"}});
        let settings = CoverageSettings::from_configuration(&config);
        assert_eq!(settings.report_dir, PathBuf::from("/repo/reports/test/unit/coverage"));
        assert_eq!(settings.options["reporting"]["print"], Value::from("detail"));
        assert_eq!(
            settings.options["reporting"]["dir"],
            Value::from("/repo/reports/test/unit/coverage")
        );
        assert_eq!(settings.options["reports"], json!(["lcov"]));
        assert_eq!(
            settings.options["instrumentation"]["excludes"],
            json!(["**/test/**", "**/node_modules/**"])
        );
    }
}
