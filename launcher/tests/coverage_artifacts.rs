//! Coverage sessions driven through full runs, written to temp projects.

use std::fs;
use std::sync::Arc;

use launcher::core::types::RunState;
use launcher::exit_codes;
use launcher::io::coverage::{COVERAGE_FILE_NAME, CoverageData};
use launcher::io::env::{CONFIG_COVERAGE_REPORT_DIR_NAME, DISABLE_CODE_COVERAGE, Environment};
use launcher::launcher::Launcher;
use launcher::test_support::{RecordingCoverageEngine, ScriptedTestEngine, TempProject};

#[tokio::test]
async fn coverage_lands_under_report_test_root() {
    let project = TempProject::new();
    let engine = Arc::new(ScriptedTestEngine::passing());
    let coverage = Arc::new(RecordingCoverageEngine::default());
    let mut launcher = Launcher::new(engine.clone())
        .with_coverage_engine(coverage.clone())
        .with_environment(Environment::default());
    launcher.configure(project.options()).expect("configure");

    let report = launcher.run().await;

    assert_eq!(report.exit_code, exit_codes::PASSED);
    let dir = project.path().join("reports/test/unit/coverage");
    let data: CoverageData =
        serde_json::from_slice(&fs::read(dir.join(COVERAGE_FILE_NAME)).expect("coverage.json"))
            .expect("parse coverage.json");
    assert!(data.contains_key("src/index.js"));
    assert!(dir.join("coverage-summary.txt").exists());
    assert_eq!(coverage.start_count(), 1);
    assert_eq!(coverage.reports_written(), 1);
    let settings = coverage.last_settings().expect("settings");
    assert_eq!(settings.root, project.path());
}

#[tokio::test]
async fn report_directory_name_comes_from_environment() {
    let project = TempProject::new();
    let engine = Arc::new(ScriptedTestEngine::failing());
    let coverage = Arc::new(RecordingCoverageEngine::default());
    let mut launcher = Launcher::new(engine.clone())
        .with_coverage_engine(coverage.clone())
        .with_environment(Environment::from_pairs([(CONFIG_COVERAGE_REPORT_DIR_NAME, "cov")]));
    launcher.configure(project.options()).expect("configure");

    let report = launcher.run().await;

    // Coverage is still saved when tests fail.
    assert_eq!(report.exit_code, exit_codes::FAILED);
    assert!(
        project
            .path()
            .join("reports/test/unit/cov")
            .join(COVERAGE_FILE_NAME)
            .exists()
    );
}

#[tokio::test]
async fn disabled_coverage_never_touches_the_engine() {
    let project = TempProject::new();
    let engine = Arc::new(ScriptedTestEngine::passing());
    let coverage = Arc::new(RecordingCoverageEngine::default());
    let mut launcher = Launcher::new(engine.clone())
        .with_coverage_engine(coverage.clone())
        .with_environment(Environment::from_pairs([(DISABLE_CODE_COVERAGE, "1")]));
    launcher.configure(project.options()).expect("configure");

    launcher.run().await;

    assert_eq!(coverage.start_count(), 0);
    assert_eq!(coverage.reports_written(), 0);
    assert!(!project.path().join("reports").exists());
}

#[tokio::test]
async fn enabled_coverage_without_engine_is_skipped() {
    let project = TempProject::new();
    let engine = Arc::new(ScriptedTestEngine::passing());
    let mut launcher = Launcher::new(engine.clone()).with_environment(Environment::default());
    launcher.configure(project.options()).expect("configure");

    let report = launcher.run().await;

    assert_eq!(report.exit_code, exit_codes::PASSED);
    assert!(!project.path().join("reports").exists());
}

#[tokio::test]
async fn coverage_start_failure_is_fatal() {
    let project = TempProject::new();
    let engine = Arc::new(ScriptedTestEngine::passing());
    let coverage = Arc::new(RecordingCoverageEngine::failing_start());
    let mut launcher = Launcher::new(engine.clone())
        .with_coverage_engine(coverage.clone())
        .with_environment(Environment::default());
    launcher.configure(project.options()).expect("configure");

    let report = launcher.run().await;

    assert_eq!(report.exit_code, exit_codes::FAILED);
    assert_eq!(report.state, RunState::ShuttingDown);
    assert_eq!(engine.launch_count(), 0);
}
