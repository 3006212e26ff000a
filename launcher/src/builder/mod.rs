//! Fluent builders for [`LaunchOptions`].
//!
//! [`ConfigBuilder`] owns one [`SectionBuilder`] per configuration section
//! and aggregates their output under each section's key. Extra sections can
//! be plugged in with [`ConfigBuilder::with_section`] without touching the
//! aggregation.

mod coverage;
mod project;
mod reports;

use serde_json::{Map, Value};

use crate::config::LaunchOptions;
use crate::core::types::Phase;
use crate::step::Step;

pub use coverage::CoverageConfigBuilder;
pub use project::ProjectConfigBuilder;
pub use reports::ReportsConfigBuilder;
pub use test::TestConfigBuilder;

/// One section of the options document.
pub trait SectionBuilder: Send {
    /// Key the section is placed under in the options document.
    fn section_key(&self) -> &'static str;

    fn build(&self) -> Value;

    /// Restore the section defaults.
    fn clear(&mut self);
}

#[derive(Default)]
pub struct ConfigBuilder {
    project: ProjectConfigBuilder,
    reports: ReportsConfigBuilder,
    test: TestConfigBuilder,
    coverage: CoverageConfigBuilder,
    extra_sections: Vec<Box<dyn SectionBuilder>>,
    developer_mode: Option<bool>,
    steps: Vec<(Phase, Step)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&mut self) -> &mut ProjectConfigBuilder {
        &mut self.project
    }

    pub fn reports(&mut self) -> &mut ReportsConfigBuilder {
        &mut self.reports
    }

    pub fn test(&mut self) -> &mut TestConfigBuilder {
        &mut self.test
    }

    pub fn coverage(&mut self) -> &mut CoverageConfigBuilder {
        &mut self.coverage
    }

    /// Add a section beyond the built-in four.
    pub fn with_section(&mut self, section: Box<dyn SectionBuilder>) -> &mut Self {
        self.extra_sections.push(section);
        self
    }

    /// `None` leaves developer mode to the environment default.
    pub fn developer_mode(&mut self, enabled: Option<bool>) -> &mut Self {
        self.developer_mode = enabled;
        self
    }

    pub fn with_pre_launch_step(&mut self, step: Step) -> &mut Self {
        self.with_step(Phase::PreLaunch, step)
    }

    pub fn with_pre_test_launch_step(&mut self, step: Step) -> &mut Self {
        self.with_step(Phase::PreTestLaunch, step)
    }

    pub fn with_post_execution_step(&mut self, step: Step) -> &mut Self {
        self.with_step(Phase::PostExecution, step)
    }

    pub fn with_clean_up_step(&mut self, step: Step) -> &mut Self {
        self.with_step(Phase::CleanUp, step)
    }

    fn with_step(&mut self, phase: Phase, step: Step) -> &mut Self {
        self.steps.push((phase, step));
        self
    }

    fn sections(&self) -> impl Iterator<Item = &dyn SectionBuilder> {
        let builtin: [&dyn SectionBuilder; 4] =
            [&self.project, &self.reports, &self.test, &self.coverage];
        builtin
            .into_iter()
            .chain(self.extra_sections.iter().map(|section| &**section as &dyn SectionBuilder))
    }

    pub fn build(&self) -> LaunchOptions {
        let mut document = Map::new();
        if let Some(enabled) = self.developer_mode {
            document.insert("developerMode".to_string(), Value::Bool(enabled));
        }
        for section in self.sections() {
            document.insert(section.section_key().to_string(), section.build());
        }

        LaunchOptions {
            document: Value::Object(document),
            spec_file_filters: self.test.spec_file_filters().to_vec(),
            steps: self.steps.clone(),
        }
    }

    /// Drop root settings and clear every section.
    pub fn clear(&mut self) -> &mut Self {
        self.developer_mode = None;
        self.steps.clear();
        self.project.clear();
        self.reports.clear();
        self.test.clear();
        self.coverage.clear();
        for section in &mut self.extra_sections {
            section.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::config::resolve::resolve;
    use crate::filter::SpecFileFilter;
    use crate::io::env::{DISABLE_CODE_COVERAGE, Environment};
    use crate::test_support::recording_step;
    use std::sync::{Arc, Mutex};

    struct CustomSection {
        value: Option<String>,
    }

    impl SectionBuilder for CustomSection {
        fn section_key(&self) -> &'static str {
            "custom"
        }

        fn build(&self) -> Value {
            json!({"value": self.value})
        }

        fn clear(&mut self) {
            self.value = None;
        }
    }

    #[test]
    fn build_places_sections_under_their_keys() {
        let mut builder = ConfigBuilder::new();
        builder.project().root_directory_path(Some("/repo"));
        builder.test().unit_test();
        builder.coverage().disable();
        let options = builder.build();

        assert_eq!(options.document["project"], json!({"rootDirectoryPath": "/repo"}));
        assert_eq!(options.document["test"]["type"], json!("unit"));
        assert_eq!(options.document["coverage"]["enabled"], json!(false));
        assert_eq!(options.document["reports"], json!({}));
        assert!(options.document.get("developerMode").is_none());
    }

    #[test]
    fn built_options_resolve() {
        let mut builder = ConfigBuilder::new();
        builder.project().root_directory_path(Some("/repo"));
        builder.test().integration_test().spec_dir_path(Some("specs"));
        builder
            .coverage()
            .report_directory(Some("cov"))
            .add_exclude_patterns(&["**/fixtures/**"]);

        let config = resolve(&builder.build(), &Environment::default()).expect("resolve");
        assert_eq!(config.test_type(), "integration");
        assert_eq!(config.spec_dir(), std::path::PathBuf::from("specs"));
        assert_eq!(config.coverage.report_directory, "cov");
        assert!(config.coverage.excludes.contains(&"**/fixtures/**".to_string()));
    }

    #[test]
    fn built_options_leave_coverage_to_the_environment_default() {
        let env = Environment::from_pairs([(DISABLE_CODE_COVERAGE, "1")]);
        let mut builder = ConfigBuilder::new();
        builder.project().root_directory_path(Some("/repo"));
        builder.test().unit_test();

        let config = resolve(&builder.build(), &env).expect("resolve");
        assert!(!config.coverage_enabled());
        assert!(config.test.reports.junit_xml);
        assert!(config.test.reports.html);

        builder.coverage().enable();
        let config = resolve(&builder.build(), &env).expect("resolve");
        assert!(config.coverage_enabled());
    }

    #[test]
    fn root_settings_are_carried() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = ConfigBuilder::new();
        builder
            .developer_mode(Some(true))
            .with_pre_launch_step(recording_step(&log, "pre"))
            .with_clean_up_step(recording_step(&log, "clean"));
        builder
            .test()
            .with_spec_file_filter(SpecFileFilter::literal("skip"));
        let options = builder.build();

        assert_eq!(options.document["developerMode"], json!(true));
        let phases: Vec<Phase> = options.steps.iter().map(|(phase, _)| *phase).collect();
        assert_eq!(phases, vec![Phase::PreLaunch, Phase::CleanUp]);
        assert_eq!(options.spec_file_filters.len(), 1);
    }

    #[test]
    fn custom_sections_are_aggregated_and_cleared() {
        let mut builder = ConfigBuilder::new();
        builder.with_section(Box::new(CustomSection {
            value: Some("x".to_string()),
        }));
        assert_eq!(builder.build().document["custom"], json!({"value": "x"}));
        builder.clear();
        assert_eq!(builder.build().document["custom"], json!({"value": null}));
    }

    #[test]
    fn clear_cascades_to_sections() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = ConfigBuilder::new();
        builder.project().root_directory_path(Some("/repo"));
        builder.test().system_test();
        builder.with_post_execution_step(recording_step(&log, "post"));
        builder.clear();
        let options = builder.build();

        assert_eq!(options.document["project"], json!({}));
        assert_eq!(options.document["test"]["type"], json!("unknown"));
        assert!(options.steps.is_empty());
    }
}
