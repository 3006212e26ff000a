//! Test engine abstraction.
//!
//! The [`TestEngine`] trait decouples the launcher from whatever actually
//! executes spec files. The engine reports the run's outcome through a
//! [`CompletionSender`], possibly long after `launch` returned. Tests use the
//! scripted engines in `test_support`.

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::warn;

use crate::config::TestPlan;
use crate::error::LaunchError;
use crate::exit_codes;

/// Outcome of the test engine's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl TestOutcome {
    pub fn from_success(succeeded: bool) -> Self {
        if succeeded { Self::Passed } else { Self::Failed }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Default exit code before any `postExecution` override.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed => exit_codes::PASSED,
            Self::Failed => exit_codes::FAILED,
        }
    }
}

/// Handed to the engine on launch; consumed when it reports.
#[derive(Debug)]
pub struct CompletionSender {
    tx: oneshot::Sender<TestOutcome>,
}

impl CompletionSender {
    pub fn report(self, outcome: TestOutcome) {
        if self.tx.send(outcome).is_err() {
            warn!(?outcome, "launcher stopped waiting before the engine reported");
        }
    }

    pub fn passed(self) {
        self.report(TestOutcome::Passed);
    }

    pub fn failed(self) {
        self.report(TestOutcome::Failed);
    }
}

/// Launcher side of the completion channel.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<TestOutcome>,
}

impl Completion {
    /// Wait for the engine. A dropped sender means the engine went away.
    pub async fn outcome(self) -> Result<TestOutcome, LaunchError> {
        self.rx.await.map_err(|_| LaunchError::EngineDisconnected)
    }
}

pub fn completion_channel() -> (CompletionSender, Completion) {
    let (tx, rx) = oneshot::channel();
    (CompletionSender { tx }, Completion { rx })
}

/// Abstraction over test execution backends.
#[async_trait]
pub trait TestEngine: Send + Sync {
    /// List candidate spec files for `plan`, before filtering.
    async fn discover(&self, plan: &TestPlan) -> anyhow::Result<Vec<String>>;

    /// Start executing `spec_files`. The outcome goes through `completion`.
    async fn launch(
        &self,
        plan: TestPlan,
        spec_files: Vec<String>,
        completion: CompletionSender,
    ) -> anyhow::Result<()>;
}
