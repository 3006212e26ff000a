//! Coverage engine abstraction and report persistence.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::CoverageSettings;

/// File name of the raw coverage dump inside the coverage report directory.
pub const COVERAGE_FILE_NAME: &str = "coverage.json";

/// Raw coverage keyed by source file.
pub type CoverageData = BTreeMap<String, Value>;

/// Collected coverage for one run, shared with the coverage engine.
#[derive(Debug, Clone, Default)]
pub struct CoverageSession {
    data: Arc<Mutex<CoverageData>>,
}

impl CoverageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, file: impl Into<String>, coverage: Value) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.into(), coverage);
    }

    pub fn snapshot(&self) -> CoverageData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Abstraction over instrumentation backends.
#[async_trait]
pub trait CoverageEngine: Send + Sync {
    /// Begin instrumenting; coverage goes into `session`.
    async fn start(&self, settings: &CoverageSettings, session: CoverageSession) -> anyhow::Result<()>;

    /// Write human-facing reports (summary, lcov, ...) into `settings.report_dir`.
    async fn write_reports(&self, settings: &CoverageSettings, data: &CoverageData) -> anyhow::Result<()>;
}

/// Create the report directory, let the engine write its reports, then dump
/// the raw data to `coverage.json`.
#[instrument(skip_all, fields(dir = %settings.report_dir.display()))]
pub async fn save_coverage(
    engine: &dyn CoverageEngine,
    settings: &CoverageSettings,
    session: &CoverageSession,
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(&settings.report_dir)
        .await
        .with_context(|| format!("create coverage dir {}", settings.report_dir.display()))?;

    let data = session.snapshot();
    engine
        .write_reports(settings, &data)
        .await
        .context("write coverage reports")?;

    let path = settings.report_dir.join(COVERAGE_FILE_NAME);
    let body = serde_json::to_vec_pretty(&data).context("serialize coverage data")?;
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), files = data.len(), "coverage saved");
    Ok(path)
}
