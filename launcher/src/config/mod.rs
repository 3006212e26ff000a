//! Resolved launcher configuration.
//!
//! A [`Configuration`] is produced by [`resolve::resolve`] and never mutated
//! afterwards; the launcher shares it behind an `Arc` while a run is active.

pub mod plan;
pub mod resolve;
pub mod schema;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::types::{Phase, ReportKind};
use crate::filter::SpecFileFilter;
use crate::io::env::{DISABLE_CODE_COVERAGE, ENABLE_DEVELOPER_MODE, Environment};
use crate::step::Step;

pub use plan::{CoverageSettings, ReporterOutput, TestPlan};

pub const DEFAULT_TEST_TYPE: &str = "unknown";
pub const DEFAULT_COVERAGE_EXCLUDES: [&str; 2] = ["**/test/**", "**/node_modules/**"];
pub const DEFAULT_COVERAGE_REPORT_DIRECTORY: &str = "coverage";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub developer_mode: bool,
    pub project: ProjectSection,
    #[serde(default)]
    pub reports: ReportsSection,
    pub test: TestSection,
    pub coverage: CoverageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSection {
    pub root_directory_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsSection {
    #[serde(default)]
    pub root_directory_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub spec_dir_path: Option<String>,
    #[serde(default)]
    pub reports: ReportToggles,
    #[serde(default)]
    pub engine_options: Value,
    #[serde(skip)]
    pub spec_file_filters: Vec<SpecFileFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportToggles {
    pub junit_xml: bool,
    pub html: bool,
}

impl Default for ReportToggles {
    fn default() -> Self {
        Self {
            junit_xml: true,
            html: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSection {
    pub enabled: bool,
    pub excludes: Vec<String>,
    pub report_directory: String,
    #[serde(default)]
    pub engine_options: Value,
}

impl Configuration {
    pub fn project_root(&self) -> &Path {
        &self.project.root_directory_path
    }

    pub fn test_type(&self) -> &str {
        &self.test.kind
    }

    /// `reports.rootDirectoryPath`, or `<project root>/reports/test`.
    pub fn report_root(&self) -> PathBuf {
        match &self.reports.root_directory_path {
            Some(path) => path.clone(),
            None => self.project_root().join("reports").join("test"),
        }
    }

    /// `<report root>/<test type>`.
    pub fn report_test_root(&self) -> PathBuf {
        self.report_root().join(self.test_type())
    }

    /// Directory the test engine looks for spec files in.
    pub fn spec_dir(&self) -> PathBuf {
        match &self.test.spec_dir_path {
            Some(path) => PathBuf::from(path),
            None if self.developer_mode => PathBuf::from("./"),
            None => Path::new("test").join(self.test_type()),
        }
    }

    pub fn coverage_enabled(&self) -> bool {
        self.coverage.enabled
    }

    pub fn coverage_report_dir(&self) -> PathBuf {
        self.report_test_root().join(&self.coverage.report_directory)
    }

    /// Report outputs for the enabled toggles.
    pub fn reporters(&self) -> Vec<ReporterOutput> {
        let root = self.report_test_root();
        let mut reporters = Vec::new();
        if self.test.reports.junit_xml {
            reporters.push(ReporterOutput {
                kind: ReportKind::JunitXml,
                output_dir: root.join("junit").join("xml"),
            });
        }
        if self.test.reports.html {
            reporters.push(ReporterOutput {
                kind: ReportKind::Html,
                output_dir: root.join("html"),
            });
        }
        reporters
    }

    pub fn spec_file_filters(&self) -> &[SpecFileFilter] {
        &self.test.spec_file_filters
    }
}

/// Everything handed to `configure`: the options document plus the
/// non-serializable parts (filters and lifecycle steps).
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub document: Value,
    pub spec_file_filters: Vec<SpecFileFilter>,
    pub steps: Vec<(Phase, Step)>,
}

impl LaunchOptions {
    pub fn from_document(document: Value) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn with_spec_file_filter(mut self, filter: SpecFileFilter) -> Self {
        self.spec_file_filters.push(filter);
        self
    }

    pub fn with_step(mut self, phase: Phase, step: Step) -> Self {
        self.steps.push((phase, step));
        self
    }
}

/// Built-in defaults, the lowest precedence layer.
pub fn default_document(env: &Environment) -> Value {
    json!({
        "developerMode": env.is_set(ENABLE_DEVELOPER_MODE),
        "project": {},
        "reports": {},
        "test": {
            "type": DEFAULT_TEST_TYPE,
            "reports": {"junitXml": true, "html": true},
            "engineOptions": {}
        },
        "coverage": {
            "enabled": !env.is_set(DISABLE_CODE_COVERAGE),
            "excludes": DEFAULT_COVERAGE_EXCLUDES,
            "reportDirectory": DEFAULT_COVERAGE_REPORT_DIRECTORY,
            "engineOptions": {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::configuration;

    #[test]
    fn derived_paths_follow_project_root() {
        let config = configuration("/repo");
        assert_eq!(config.report_root(), PathBuf::from("/repo/reports/test"));
        assert_eq!(config.report_test_root(), PathBuf::from("/repo/reports/test/unit"));
        assert_eq!(config.spec_dir(), PathBuf::from("test/unit"));
        assert_eq!(
            config.coverage_report_dir(),
            PathBuf::from("/repo/reports/test/unit/coverage")
        );
    }

    #[test]
    fn explicit_report_root_wins() {
        let mut config = configuration("/repo");
        config.reports.root_directory_path = Some(PathBuf::from("/out"));
        assert_eq!(config.report_test_root(), PathBuf::from("/out/unit"));
    }

    #[test]
    fn spec_dir_prefers_explicit_then_developer_mode() {
        let mut config = configuration("/repo");
        config.developer_mode = true;
        assert_eq!(config.spec_dir(), PathBuf::from("./"));
        config.test.spec_dir_path = Some("specs".to_string());
        assert_eq!(config.spec_dir(), PathBuf::from("specs"));
    }

    #[test]
    fn reporters_follow_toggles() {
        let mut config = configuration("/repo");
        config.test.reports.html = false;
        let reporters = config.reporters();
        assert_eq!(reporters.len(), 1);
        assert_eq!(reporters[0].kind, ReportKind::JunitXml);
        assert_eq!(
            reporters[0].output_dir,
            PathBuf::from("/repo/reports/test/unit/junit/xml")
        );
    }

    #[test]
    fn defaults_read_environment_switches() {
        let env = Environment::from_pairs([(DISABLE_CODE_COVERAGE, "1"), (ENABLE_DEVELOPER_MODE, "1")]);
        let defaults = default_document(&env);
        assert_eq!(defaults["coverage"]["enabled"], Value::Bool(false));
        assert_eq!(defaults["developerMode"], Value::Bool(true));

        let defaults = default_document(&Environment::default());
        assert_eq!(defaults["coverage"]["enabled"], Value::Bool(true));
        assert_eq!(defaults["test"]["type"], Value::from(DEFAULT_TEST_TYPE));
    }
}
