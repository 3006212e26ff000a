//! Run controller.
//!
//! [`Launcher`] owns the lifecycle state, the resolved configuration and the
//! step registry, and sequences a run:
//!
//! ```text
//! configure -> start: discover, filter, preLaunch, coverage, preTestLaunch, launch
//!           -> wait:  completion, postExecution, cleanUp, shut down
//! ```
//!
//! The launcher never terminates the process. [`Launcher::run`] and
//! [`Launcher::wait`] hand a [`RunReport`] back to the host instead.

use std::mem;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use crate::config::resolve::resolve;
use crate::config::{Configuration, CoverageSettings, LaunchOptions, TestPlan};
use crate::core::lifecycle::{Lifecycle, StartDecision};
use crate::core::types::{Phase, RunReport, RunState};
use crate::error::{LaunchError, LifecycleError, Result, StepError};
use crate::exit_codes;
use crate::filter::FilterChain;
use crate::io::coverage::{CoverageEngine, CoverageSession, save_coverage};
use crate::io::engine::{Completion, TestEngine, completion_channel};
use crate::io::env::Environment;
use crate::step::{
    ExecutionContext, ExitCodeSetter, PhaseOptions, Step, StepContext, StepOutcome, StepRegistry,
};

/// Internal `postExecution` step persisting coverage.
pub const SAVE_COVERAGE_STEP: &str = "save-coverage";

/// Coverage state for the run in flight.
#[derive(Clone)]
struct CoverageRun {
    engine: Arc<dyn CoverageEngine>,
    settings: CoverageSettings,
    session: CoverageSession,
}

type CoverageSlot = Arc<Mutex<Option<CoverageRun>>>;

fn lock(slot: &CoverageSlot) -> MutexGuard<'_, Option<CoverageRun>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Launcher {
    test_engine: Arc<dyn TestEngine>,
    coverage_engine: Option<Arc<dyn CoverageEngine>>,
    environment: Environment,
    lifecycle: Lifecycle,
    configuration: Option<Arc<Configuration>>,
    steps: StepRegistry,
    execution: ExecutionContext,
    exit_code: Arc<AtomicI32>,
    completion: Option<Completion>,
    coverage: CoverageSlot,
}

impl Launcher {
    /// Create a launcher reading the process environment at configure time.
    pub fn new(test_engine: Arc<dyn TestEngine>) -> Self {
        let coverage = CoverageSlot::default();
        let mut steps = StepRegistry::new();
        register_internal_steps(&mut steps, &coverage);

        Self {
            test_engine,
            coverage_engine: None,
            environment: Environment::from_process(),
            lifecycle: Lifecycle::new(),
            configuration: None,
            steps,
            execution: ExecutionContext::new(),
            exit_code: Arc::new(AtomicI32::new(exit_codes::PASSED)),
            completion: None,
            coverage,
        }
    }

    pub fn with_coverage_engine(mut self, engine: Arc<dyn CoverageEngine>) -> Self {
        self.coverage_engine = Some(engine);
        self
    }

    /// Resolve configuration against `environment` instead of the process env.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn state(&self) -> RunState {
        self.lifecycle.state()
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_deref()
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    /// Run-scoped values left by steps.
    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    pub fn register_step(&mut self, phase: Phase, step: Step) -> &mut Self {
        self.steps.register(phase, step);
        self
    }

    pub fn with_pre_launch_step(&mut self, step: Step) -> &mut Self {
        self.register_step(Phase::PreLaunch, step)
    }

    pub fn with_pre_test_launch_step(&mut self, step: Step) -> &mut Self {
        self.register_step(Phase::PreTestLaunch, step)
    }

    pub fn with_post_execution_step(&mut self, step: Step) -> &mut Self {
        self.register_step(Phase::PostExecution, step)
    }

    pub fn with_clean_up_step(&mut self, step: Step) -> &mut Self {
        self.register_step(Phase::CleanUp, step)
    }

    /// Resolve `options` and enter `Ready`. On failure nothing changes.
    #[instrument(skip_all)]
    pub fn configure(&mut self, options: LaunchOptions) -> Result<()> {
        self.lifecycle.check_configure()?;
        let configuration = resolve(&options, &self.environment)?;
        self.lifecycle.configure()?;

        info!(
            project_root = %configuration.project_root().display(),
            test_type = configuration.test_type(),
            coverage = configuration.coverage_enabled(),
            steps = options.steps.len(),
            "launcher configured"
        );
        self.configuration = Some(Arc::new(configuration));
        self.steps.extend(options.steps);
        Ok(())
    }

    /// Run the setup phases and launch the test engine.
    ///
    /// Calling `start` while a run is in flight does nothing. Any setup
    /// failure runs `cleanUp`, shuts the launcher down and is returned.
    #[instrument(skip_all)]
    pub async fn start(&mut self) -> Result<()> {
        match self.lifecycle.check_start() {
            Ok(StartDecision::Proceed) => {}
            Ok(StartDecision::AlreadyRunning) => {
                info!("already running");
                return Ok(());
            }
            Err(err) => {
                error!(error = %err, "start rejected");
                return Err(err.into());
            }
        }
        let configuration = self.current_configuration()?;
        self.exit_code.store(exit_codes::PASSED, Ordering::SeqCst);

        match self.launch(&configuration).await {
            Ok(completion) => {
                self.completion = Some(completion);
                self.lifecycle.mark_running()?;
                info!("test engine launched");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "start failed");
                // cleanUp failures are already logged; the setup error wins.
                let _ = self.run_clean_up(&configuration).await;
                lock(&self.coverage).take();
                self.exit_code.store(exit_codes::FAILED, Ordering::SeqCst);
                self.lifecycle.shut_down();
                Err(err)
            }
        }
    }

    /// Wait for the test engine, run the teardown phases and shut down.
    #[instrument(skip_all)]
    pub async fn wait(&mut self) -> Result<RunReport> {
        let Some(completion) = self.completion.take() else {
            return Err(LifecycleError::NotReady {
                state: self.lifecycle.state(),
            }
            .into());
        };
        let configuration = self.current_configuration()?;

        let outcome = match completion.outcome().await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!(error = %err, "test engine did not report an outcome");
                None
            }
        };
        self.lifecycle.complete_execution()?;

        let succeeded = outcome.is_some_and(|outcome| outcome.succeeded());
        let exit_code = outcome.map_or(exit_codes::FAILED, |outcome| outcome.exit_code());
        self.exit_code.store(exit_code, Ordering::SeqCst);
        info!(succeeded, exit_code, "test execution completed");

        let setter: ExitCodeSetter = {
            let code = Arc::clone(&self.exit_code);
            Arc::new(move |value| code.store(value, Ordering::SeqCst))
        };
        let options = PhaseOptions::for_phase(Phase::PostExecution).with_exit_code_setter(setter);
        let post_execution = self
            .run_phase(Phase::PostExecution, &configuration, options, Some(succeeded))
            .await;
        if let Err(err) = &post_execution {
            error!(error = %err, "postExecution failed");
        }
        let clean_up = self.run_clean_up(&configuration).await;
        if post_execution.is_err() || clean_up.is_err() {
            self.exit_code.store(exit_codes::FAILED, Ordering::SeqCst);
        }

        lock(&self.coverage).take();
        self.lifecycle.shut_down();
        let report = RunReport {
            state: self.lifecycle.state(),
            exit_code: self.exit_code(),
        };
        info!(exit_code = report.exit_code, "launcher shut down");
        Ok(report)
    }

    /// `start` followed by `wait`.
    pub async fn run(&mut self) -> RunReport {
        let result = match self.start().await {
            Ok(()) => self.wait().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(report) => report,
            Err(err) => {
                error!(error = %err, "run failed");
                RunReport {
                    state: self.lifecycle.state(),
                    exit_code: exit_codes::FAILED,
                }
            }
        }
    }

    /// Back to `None`: configuration, external steps and execution context are dropped.
    pub fn reset(&mut self) {
        self.lifecycle.reset();
        self.configuration = None;
        self.steps.clear_external();
        self.execution.clear();
        self.completion = None;
        lock(&self.coverage).take();
        self.exit_code.store(exit_codes::PASSED, Ordering::SeqCst);
        debug!("launcher reset");
    }

    fn current_configuration(&self) -> Result<Arc<Configuration>, LifecycleError> {
        self.configuration
            .clone()
            .ok_or(LifecycleError::NotReady {
                state: self.lifecycle.state(),
            })
    }

    async fn launch(&mut self, configuration: &Arc<Configuration>) -> Result<Completion> {
        let plan = TestPlan::from_configuration(configuration);
        let discovered = self
            .test_engine
            .discover(&plan)
            .await
            .map_err(LaunchError::Engine)?;
        let chain = FilterChain::new(configuration.spec_file_filters())?;
        let discovered_count = discovered.len();
        let spec_files = chain.filter_spec_files(discovered).await?;
        info!(
            discovered = discovered_count,
            filters = chain.len(),
            selected = spec_files.len(),
            "spec files selected"
        );

        self.run_phase(
            Phase::PreLaunch,
            configuration,
            PhaseOptions::for_phase(Phase::PreLaunch),
            None,
        )
        .await?;
        self.start_coverage(configuration).await?;
        self.run_phase(
            Phase::PreTestLaunch,
            configuration,
            PhaseOptions::for_phase(Phase::PreTestLaunch),
            None,
        )
        .await?;

        let (sender, completion) = completion_channel();
        self.test_engine
            .launch(plan, spec_files, sender)
            .await
            .map_err(LaunchError::Engine)?;
        Ok(completion)
    }

    async fn start_coverage(&self, configuration: &Configuration) -> Result<()> {
        if !configuration.coverage_enabled() {
            debug!("coverage disabled");
            return Ok(());
        }
        let Some(engine) = &self.coverage_engine else {
            warn!("coverage enabled but no coverage engine installed, skipping");
            return Ok(());
        };

        let settings = CoverageSettings::from_configuration(configuration);
        let session = CoverageSession::new();
        engine
            .start(&settings, session.clone())
            .await
            .map_err(LaunchError::Coverage)?;
        info!(report_dir = %settings.report_dir.display(), "coverage started");
        *lock(&self.coverage) = Some(CoverageRun {
            engine: Arc::clone(engine),
            settings,
            session,
        });
        Ok(())
    }

    async fn run_phase(
        &mut self,
        phase: Phase,
        configuration: &Arc<Configuration>,
        options: PhaseOptions,
        test_succeeded: Option<bool>,
    ) -> Result<(), StepError> {
        let execution = mem::take(&mut self.execution);
        let mut context = StepContext::new(
            phase,
            Arc::clone(configuration),
            self.lifecycle.state(),
            execution,
        );
        if let Some(succeeded) = test_succeeded {
            context = context.with_test_succeeded(succeeded);
        }
        let result = self.steps.run_phase(phase, &mut context, options).await;
        self.execution = context.into_execution();
        result
    }

    async fn run_clean_up(&mut self, configuration: &Arc<Configuration>) -> Result<(), StepError> {
        let result = self
            .run_phase(
                Phase::CleanUp,
                configuration,
                PhaseOptions::for_phase(Phase::CleanUp),
                None,
            )
            .await;
        if let Err(err) = &result {
            error!(error = %err, "cleanUp failed");
        }
        result
    }
}

fn register_internal_steps(steps: &mut StepRegistry, coverage: &CoverageSlot) {
    let coverage = Arc::clone(coverage);
    steps.register_internal(
        Phase::PostExecution,
        SAVE_COVERAGE_STEP,
        move |_ctx: &mut StepContext| {
            let run = lock(&coverage).clone();
            async move {
                let Some(run) = run else {
                    debug!("no coverage session, nothing to save");
                    return Ok(StepOutcome::Continue);
                };
                save_coverage(run.engine.as_ref(), &run.settings, &run.session)
                    .await
                    .map(|_| StepOutcome::Continue)
            }
            .boxed()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    use crate::io::env::DISABLE_CODE_COVERAGE;
    use crate::test_support::{ScriptedTestEngine, minimal_options};

    fn launcher(engine: &Arc<ScriptedTestEngine>) -> Launcher {
        Launcher::new(engine.clone())
            .with_environment(Environment::from_pairs([(DISABLE_CODE_COVERAGE, "1")]))
    }

    #[tokio::test]
    async fn configure_failure_leaves_state_untouched() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        let err = launcher
            .configure(LaunchOptions::from_document(json!({"test": {"type": "unit"}})))
            .unwrap_err();
        assert!(matches!(err, LaunchError::Config(_)), "{err}");
        assert_eq!(launcher.state(), RunState::None);
        assert!(launcher.configuration().is_none());
    }

    #[tokio::test]
    async fn reconfigure_before_start_appends_steps_and_replaces_configuration() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        let counting = |key: &'static str| {
            Step::new(move |ctx: &mut StepContext| {
                async move {
                    let count = ctx.execution.get(key).and_then(Value::as_u64).unwrap_or(0);
                    ctx.execution.insert(key.to_string(), Value::from(count + 1));
                    Ok(StepOutcome::Continue)
                }
                .boxed()
            })
        };

        launcher
            .configure(minimal_options("/first").with_step(Phase::PreLaunch, counting("pre")))
            .expect("first");
        launcher
            .configure(minimal_options("/second").with_step(Phase::PreLaunch, counting("pre")))
            .expect("second");
        assert_eq!(
            launcher.configuration().map(Configuration::project_root),
            Some(std::path::Path::new("/second"))
        );

        let report = launcher.run().await;
        assert_eq!(report.exit_code, exit_codes::PASSED);
        assert_eq!(launcher.execution().get("pre"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn configure_while_running_is_busy() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        launcher.configure(minimal_options("/repo")).expect("configure");
        launcher.start().await.expect("start");
        let err = launcher.configure(minimal_options("/repo")).unwrap_err();
        assert!(
            matches!(err, LaunchError::Lifecycle(LifecycleError::Busy { state: RunState::Running })),
            "{err}"
        );
        launcher.wait().await.expect("wait");
    }

    #[tokio::test]
    async fn second_start_while_running_is_a_no_op() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        launcher.configure(minimal_options("/repo")).expect("configure");
        launcher.start().await.expect("start");
        launcher.start().await.expect("start again");
        assert_eq!(engine.launch_count(), 1);
        let report = launcher.wait().await.expect("wait");
        assert_eq!(report.state, RunState::ShuttingDown);
    }

    #[tokio::test]
    async fn wait_without_start_is_rejected() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        let err = launcher.wait().await.unwrap_err();
        assert!(matches!(err, LaunchError::Lifecycle(LifecycleError::NotReady { .. })));
    }

    #[tokio::test]
    async fn reset_clears_steps_and_execution() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        launcher.with_pre_launch_step(Step::new(|_ctx: &mut StepContext| {
            async { Err(anyhow::anyhow!("should have been cleared")) }.boxed()
        }));
        launcher.configure(minimal_options("/repo")).expect("configure");
        launcher.reset();
        assert_eq!(launcher.state(), RunState::None);
        assert!(launcher.configuration().is_none());

        launcher.configure(minimal_options("/repo")).expect("configure");
        let report = launcher.run().await;
        assert_eq!(report.exit_code, exit_codes::PASSED);
    }

    #[tokio::test]
    async fn launcher_can_be_reused_after_shutdown() {
        let engine = Arc::new(ScriptedTestEngine::passing());
        let mut launcher = launcher(&engine);
        launcher.configure(minimal_options("/repo")).expect("configure");
        assert_eq!(launcher.run().await.state, RunState::ShuttingDown);
        launcher.configure(minimal_options("/repo")).expect("reconfigure");
        assert_eq!(launcher.state(), RunState::Ready);
        assert_eq!(launcher.run().await.exit_code, exit_codes::PASSED);
        assert_eq!(engine.launch_count(), 2);
    }
}
