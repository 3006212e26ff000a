//! Test-only helpers: scripted engines, recording steps and temp projects.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use tempfile::TempDir;

use crate::config::resolve::resolve;
use crate::config::{Configuration, CoverageSettings, LaunchOptions, TestPlan};
use crate::io::coverage::{CoverageData, CoverageEngine, CoverageSession};
use crate::io::engine::{CompletionSender, TestEngine, TestOutcome};
use crate::io::env::Environment;
use crate::step::{Step, StepContext, StepOutcome};

/// Minimal valid options rooted at `root`, test type `unit`.
pub fn minimal_options(root: &str) -> LaunchOptions {
    LaunchOptions::from_document(json!({
        "project": {"rootDirectoryPath": root},
        "test": {"type": "unit"},
        "coverage": {}
    }))
}

/// Resolve [`minimal_options`] against an empty environment.
pub fn configuration(root: &str) -> Configuration {
    resolve(&minimal_options(root), &Environment::default()).expect("resolve minimal options")
}

/// A step appending `label` to `log` every time it runs.
pub fn recording_step(log: &Arc<Mutex<Vec<String>>>, label: &str) -> Step {
    let log = Arc::clone(log);
    let label = label.to_string();
    Step::named(label.clone(), move |_ctx: &mut StepContext| {
        let log = Arc::clone(&log);
        let label = label.clone();
        async move {
            log.lock().expect("step log").push(label);
            Ok(StepOutcome::Continue)
        }
        .boxed()
    })
}

/// Project root in a temp directory, removed on drop.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn options(&self) -> LaunchOptions {
        minimal_options(self.path().to_str().expect("utf-8 temp path"))
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum EngineScript {
    Report(TestOutcome),
    /// Drop the completion sender without reporting.
    Disconnect,
    FailLaunch(String),
    FailDiscovery(String),
}

/// Test engine with a predetermined behavior. Reports during `launch`.
#[derive(Debug)]
pub struct ScriptedTestEngine {
    script: EngineScript,
    discovered: Vec<String>,
    launches: Mutex<Vec<Vec<String>>>,
    plans: Mutex<Vec<TestPlan>>,
}

impl ScriptedTestEngine {
    fn scripted(script: EngineScript) -> Self {
        Self {
            script,
            discovered: vec!["a.spec.js".to_string(), "b.spec.js".to_string()],
            launches: Mutex::new(Vec::new()),
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn passing() -> Self {
        Self::scripted(EngineScript::Report(TestOutcome::Passed))
    }

    pub fn failing() -> Self {
        Self::scripted(EngineScript::Report(TestOutcome::Failed))
    }

    pub fn disconnecting() -> Self {
        Self::scripted(EngineScript::Disconnect)
    }

    pub fn failing_launch(message: &str) -> Self {
        Self::scripted(EngineScript::FailLaunch(message.to_string()))
    }

    pub fn failing_discovery(message: &str) -> Self {
        Self::scripted(EngineScript::FailDiscovery(message.to_string()))
    }

    /// Files returned by `discover`.
    pub fn with_spec_files(mut self, files: &[&str]) -> Self {
        self.discovered = files.iter().map(|file| file.to_string()).collect();
        self
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().expect("launches").len()
    }

    /// Spec files handed to the most recent launch.
    pub fn launched_spec_files(&self) -> Option<Vec<String>> {
        self.launches.lock().expect("launches").last().cloned()
    }

    pub fn last_plan(&self) -> Option<TestPlan> {
        self.plans.lock().expect("plans").last().cloned()
    }
}

#[async_trait]
impl TestEngine for ScriptedTestEngine {
    async fn discover(&self, plan: &TestPlan) -> anyhow::Result<Vec<String>> {
        self.plans.lock().expect("plans").push(plan.clone());
        match &self.script {
            EngineScript::FailDiscovery(message) => Err(anyhow!(message.clone())),
            _ => Ok(self.discovered.clone()),
        }
    }

    async fn launch(
        &self,
        _plan: TestPlan,
        spec_files: Vec<String>,
        completion: CompletionSender,
    ) -> anyhow::Result<()> {
        if let EngineScript::FailLaunch(message) = &self.script {
            return Err(anyhow!(message.clone()));
        }
        self.launches.lock().expect("launches").push(spec_files);
        match &self.script {
            EngineScript::Report(outcome) => completion.report(*outcome),
            _ => drop(completion),
        }
        Ok(())
    }
}

/// Coverage engine recording calls; `start` seeds the session with one file.
#[derive(Debug, Default)]
pub struct RecordingCoverageEngine {
    fail_start: bool,
    starts: Mutex<Vec<CoverageSettings>>,
    reports: Mutex<Vec<CoverageData>>,
}

impl RecordingCoverageEngine {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.lock().expect("starts").len()
    }

    pub fn reports_written(&self) -> usize {
        self.reports.lock().expect("reports").len()
    }

    pub fn last_settings(&self) -> Option<CoverageSettings> {
        self.starts.lock().expect("starts").last().cloned()
    }
}

#[async_trait]
impl CoverageEngine for RecordingCoverageEngine {
    async fn start(&self, settings: &CoverageSettings, session: CoverageSession) -> anyhow::Result<()> {
        if self.fail_start {
            return Err(anyhow!("instrumentation unavailable"));
        }
        self.starts.lock().expect("starts").push(settings.clone());
        session.record("src/index.js", json!({"s": {"0": 1}}));
        Ok(())
    }

    async fn write_reports(&self, settings: &CoverageSettings, data: &CoverageData) -> anyhow::Result<()> {
        std::fs::write(settings.report_dir.join("coverage-summary.txt"), format!("files: {}\n", data.len()))?;
        self.reports.lock().expect("reports").push(data.clone());
        Ok(())
    }
}
