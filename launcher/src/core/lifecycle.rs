//! Lifecycle state machine for a single run.
//!
//! ```text
//! None --configure--> Ready --start--> Running --completion--> PostExecution --> ShuttingDown
//! ```
//!
//! The machine only validates transitions; the controller decides when to
//! request them.

use crate::core::types::RunState;
use crate::error::LifecycleError;

/// What `start()` should do given the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// State is `Ready`: run the setup phases and launch the engine.
    Proceed,
    /// A run is already in flight; `start()` succeeds without doing anything.
    AlreadyRunning,
}

#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: RunState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Enter `Ready`. Allowed before a run starts and after one has shut down.
    pub fn configure(&mut self) -> Result<(), LifecycleError> {
        self.check_configure()?;
        self.state = RunState::Ready;
        Ok(())
    }

    pub fn check_configure(&self) -> Result<(), LifecycleError> {
        match self.state {
            RunState::None | RunState::Ready | RunState::ShuttingDown => Ok(()),
            state => Err(LifecycleError::Busy { state }),
        }
    }

    pub fn check_start(&self) -> Result<StartDecision, LifecycleError> {
        match self.state {
            RunState::Ready => Ok(StartDecision::Proceed),
            RunState::Running => Ok(StartDecision::AlreadyRunning),
            state => Err(LifecycleError::NotReady { state }),
        }
    }

    pub fn mark_running(&mut self) -> Result<(), LifecycleError> {
        self.transition(RunState::Ready, RunState::Running)
    }

    /// Called once the test engine reported completion.
    pub fn complete_execution(&mut self) -> Result<(), LifecycleError> {
        self.transition(RunState::Running, RunState::PostExecution)
    }

    /// Terminal transition. Unconditional: teardown must always be reachable.
    pub fn shut_down(&mut self) {
        self.state = RunState::ShuttingDown;
    }

    pub fn reset(&mut self) {
        self.state = RunState::None;
    }

    fn transition(&mut self, from: RunState, to: RunState) -> Result<(), LifecycleError> {
        if self.state != from {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
