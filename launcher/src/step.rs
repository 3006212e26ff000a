//! Step pipeline: ordered execution of the steps registered for a phase.
//!
//! Each phase holds two lists. Internal steps are registered by the launcher
//! itself and run first, sorted by name; external steps follow in
//! registration order. Steps run one at a time and share a single
//! [`StepContext`], which is the only channel between them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::Configuration;
use crate::core::types::{Phase, RunState};
use crate::error::StepError;

/// Run-scoped data shared by every step of every phase.
pub type ExecutionContext = Map<String, Value>;

pub type StepFuture<'a> = BoxFuture<'a, anyhow::Result<StepOutcome>>;
pub type StepHandler = Arc<dyn for<'a> Fn(&'a mut StepContext) -> StepFuture<'a> + Send + Sync>;
pub type ExitCodeSetter = Arc<dyn Fn(i32) + Send + Sync>;

/// What the pipeline does after a step succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepOutcome {
    #[default]
    Continue,
    /// Skip every remaining step of this phase invocation. Not an error.
    StopWorkflow,
}

/// A registered asynchronous handler.
#[derive(Clone)]
pub struct Step {
    name: Option<String>,
    handler: StepHandler,
}

impl Step {
    pub fn new<F>(handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: None,
            handler: Arc::new(handler),
        }
    }

    pub fn named<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish_non_exhaustive()
    }
}

/// State handed to every step of a phase.
pub struct StepContext {
    phase: Phase,
    configuration: Arc<Configuration>,
    state: RunState,
    /// Run-scoped values; survives across phases.
    pub execution: ExecutionContext,
    /// Phase-scoped values attached by earlier steps of the same phase.
    pub fields: Map<String, Value>,
    test_succeeded: Option<bool>,
    exit_code_setter: Option<ExitCodeSetter>,
}

impl StepContext {
    pub fn new(
        phase: Phase,
        configuration: Arc<Configuration>,
        state: RunState,
        execution: ExecutionContext,
    ) -> Self {
        Self {
            phase,
            configuration,
            state,
            execution,
            fields: Map::new(),
            test_succeeded: None,
            exit_code_setter: None,
        }
    }

    pub fn with_test_succeeded(mut self, succeeded: bool) -> Self {
        self.test_succeeded = Some(succeeded);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Outcome of the test engine. Only known during `postExecution`.
    pub fn test_succeeded(&self) -> Option<bool> {
        self.test_succeeded
    }

    /// Override the run's exit code. Returns `false` when the current phase
    /// does not allow it.
    pub fn set_exit_code(&self, code: i32) -> bool {
        match &self.exit_code_setter {
            Some(setter) => {
                debug!(phase = %self.phase, code, "step overrides exit code");
                setter(code);
                true
            }
            None => {
                warn!(phase = %self.phase, code, "exit code can only be set during postExecution");
                false
            }
        }
    }

    pub fn into_execution(self) -> ExecutionContext {
        self.execution
    }
}

/// Failure policy and hooks for one phase invocation.
#[derive(Clone, Default)]
pub struct PhaseOptions {
    pub stop_on_error: bool,
    pub exit_code_setter: Option<ExitCodeSetter>,
}

impl PhaseOptions {
    /// Default policy for `phase` (see [`Phase::stops_on_error`]).
    pub fn for_phase(phase: Phase) -> Self {
        Self {
            stop_on_error: phase.stops_on_error(),
            exit_code_setter: None,
        }
    }

    pub fn with_exit_code_setter(mut self, setter: ExitCodeSetter) -> Self {
        self.exit_code_setter = Some(setter);
        self
    }
}

/// Internal and external steps per phase. Append-only until [`StepRegistry::clear_external`].
#[derive(Clone, Default)]
pub struct StepRegistry {
    internal: BTreeMap<Phase, Vec<Step>>,
    external: BTreeMap<Phase, Vec<Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a launcher-owned step. Internal steps are ordered by name.
    pub fn register_internal<F>(&mut self, phase: Phase, name: impl Into<String>, handler: F)
    where
        F: for<'a> Fn(&'a mut StepContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.internal
            .entry(phase)
            .or_default()
            .push(Step::named(name, handler));
    }

    /// Append a user step to `phase`.
    pub fn register(&mut self, phase: Phase, step: Step) {
        self.external.entry(phase).or_default().push(step);
    }

    pub fn extend<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = (Phase, Step)>,
    {
        for (phase, step) in steps {
            self.register(phase, step);
        }
    }

    pub fn clear_external(&mut self) {
        self.external.clear();
    }

    /// Execution order for `phase`: internal by name, then external as registered.
    pub fn steps(&self, phase: Phase) -> Vec<Step> {
        let mut internal = self.internal.get(&phase).cloned().unwrap_or_default();
        internal.sort_by(|left, right| left.name.cmp(&right.name));
        let external = self.external.get(&phase).into_iter().flatten().cloned();
        internal.into_iter().chain(external).collect()
    }

    /// Run every step of `phase` sequentially against `context`.
    ///
    /// With `stop_on_error` the first failure aborts the phase. Without it
    /// every step runs and the first failure is returned afterwards.
    pub async fn run_phase(
        &self,
        phase: Phase,
        context: &mut StepContext,
        options: PhaseOptions,
    ) -> Result<(), StepError> {
        let steps = self.steps(phase);
        if steps.is_empty() {
            debug!(phase = %phase, "no steps registered");
            return Ok(());
        }

        context.exit_code_setter = options.exit_code_setter.clone();
        let span = info_span!("phase", phase = %phase, steps = steps.len());
        let result = run_steps(phase, &steps, context, options.stop_on_error)
            .instrument(span)
            .await;
        context.exit_code_setter = None;
        result
    }
}

async fn run_steps(
    phase: Phase,
    steps: &[Step],
    context: &mut StepContext,
    stop_on_error: bool,
) -> Result<(), StepError> {
    let mut first_failure: Option<StepError> = None;

    for (index, step) in steps.iter().enumerate() {
        debug!(index, name = ?step.name(), "running step");
        match (step.handler)(context).await {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::StopWorkflow) => {
                info!(index, skipped = steps.len() - index - 1, "step stopped the workflow");
                break;
            }
            Err(error) => {
                let failure = StepError {
                    phase,
                    index,
                    name: step.name.clone(),
                    error,
                };
                if stop_on_error {
                    error!(error = %failure, "step failed, aborting phase");
                    return Err(failure);
                }
                warn!(error = %failure, "step failed, continuing");
                first_failure.get_or_insert(failure);
            }
        }
    }

    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
