//! Step runners - execute a single step on the local host

pub mod actions;
pub mod config;
pub mod outcome;
pub mod shell;

use crate::core::{Step, StepAction, StepEnvironment};
use async_trait::async_trait;
pub use actions::ActionRegistry;
pub use config::RunnerConfig;
pub use outcome::{RunnerError, StepOutcome};
pub use shell::ShellCommandRunner;

/// Trait for step execution - allows for different implementations
///
/// Implementations only run the step. Ordering, timeouts, and cancellation
/// are imposed by the caller, which may drop the returned future at any point.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run one step and report how it exited
    async fn run_step(
        &self,
        step: &Step,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError>;
}

/// Runner that executes commands and built-in actions on this machine
#[derive(Debug, Clone)]
pub struct LocalRunner {
    shell: ShellCommandRunner,
    actions: ActionRegistry,
}

impl LocalRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            shell: ShellCommandRunner::new(config),
            actions: ActionRegistry::new(),
        }
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl StepRunner for LocalRunner {
    async fn run_step(
        &self,
        step: &Step,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError> {
        match &step.action {
            StepAction::Run { command } => self.shell.execute(command, env).await,
            StepAction::Uses { action, with } => self.actions.invoke(action, with, env).await,
        }
    }
}
