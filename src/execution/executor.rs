//! Job executor - runs one job's steps in order, stopping at the first failure

use crate::{
    core::{Job, JobContext, JobResult, JobState, Step, StepEnvironment, StepRecord, TriggerKind, NO_EXIT_STATUS},
    execution::{engine::EventEmitter, CancelHandle, ExecutionEvent},
    runner::{RunnerError, StepOutcome, StepRunner},
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

/// Tunables applied to every step a job executor runs
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Timeout for every step, overriding per-step values
    pub step_timeout_secs: Option<u64>,

    /// Lines of output kept in each step record
    pub output_tail_lines: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            step_timeout_secs: None,
            output_tail_lines: 40,
        }
    }
}

/// Read-only inputs shared by every job of one invocation
#[derive(Clone)]
pub struct JobInputs {
    pub trigger: TriggerKind,
    pub pipeline_env: Arc<HashMap<String, String>>,
    pub source_dir: Arc<PathBuf>,
    pub cancel: CancelHandle,
    pub events: EventEmitter,
}

/// Executes a single job
pub struct JobExecutor<R> {
    runner: Arc<R>,
    settings: ExecutorSettings,
}

impl<R: StepRunner> JobExecutor<R> {
    pub fn new(runner: Arc<R>, settings: ExecutorSettings) -> Self {
        Self { runner, settings }
    }

    /// Run every step of `job` in order inside a fresh workspace
    ///
    /// Never fails: every problem ends up in the returned `JobResult`.
    pub async fn execute(&self, job: &Job, inputs: &JobInputs) -> JobResult {
        if inputs.cancel.is_cancelled() {
            info!("Job {} cancelled before start", job.id);
            let result = JobResult::cancelled_before_start(job);
            self.finish(&result, inputs);
            return result;
        }

        let mut result = JobResult::new(job);
        let started_at = Utc::now();
        result.state = JobState::Running { started_at };

        info!("Starting job {} on {}", job.id, job.platform);
        inputs.events.emit(ExecutionEvent::JobStarted {
            job_id: job.id.clone(),
            platform: job.platform.label.clone(),
        });

        let context = match JobContext::create(
            job,
            &inputs.pipeline_env,
            inputs.trigger,
            &inputs.source_dir,
        ) {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to create workspace for job {}: {}", job.id, e);
                result.state = JobState::Failed {
                    step_index: 0,
                    step_name: job.steps.first().map(|s| s.name.clone()).unwrap_or_default(),
                    exit_status: NO_EXIT_STATUS,
                    error: Some(format!("Failed to create workspace: {}", e)),
                    started_at,
                    finished_at: Utc::now(),
                };
                self.finish(&result, inputs);
                return result;
            }
        };
        debug!("Job {} workspace: {}", job.id, context.workspace_path().display());

        let mut final_state = None;

        for step in &job.steps {
            if inputs.cancel.is_cancelled() {
                warn!("Job {} cancelled before step {}", job.id, step.name);
                final_state = Some(JobState::Cancelled {
                    step_index: Some(step.index),
                    cancelled_at: Utc::now(),
                });
                break;
            }

            let step_env = context.step_environment(step, job);
            info!("[{}] step {}: {}", job.id, step.index + 1, step.name);
            inputs.events.emit(ExecutionEvent::StepStarted {
                job_id: job.id.clone(),
                step_index: step.index,
                step_name: step.name.clone(),
            });

            let timer = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = inputs.cancel.cancelled() => None,
                outcome = self.run_with_timeout(step, &step_env) => Some(outcome),
            };
            let duration_ms = timer.elapsed().as_millis() as u64;

            match outcome {
                None => {
                    warn!("Job {} cancelled during step {}", job.id, step.name);
                    result.steps.push(StepRecord {
                        index: step.index,
                        name: step.name.clone(),
                        exit_status: NO_EXIT_STATUS,
                        duration_ms,
                        output: String::new(),
                        error: Some(RunnerError::Cancelled.to_string()),
                    });
                    final_state = Some(JobState::Cancelled {
                        step_index: Some(step.index),
                        cancelled_at: Utc::now(),
                    });
                    break;
                }
                Some(Ok(outcome)) => {
                    let output = tail_lines(&outcome.combined_output(), self.settings.output_tail_lines);
                    result.steps.push(StepRecord {
                        index: step.index,
                        name: step.name.clone(),
                        exit_status: outcome.exit_status,
                        duration_ms,
                        output: output.clone(),
                        error: None,
                    });

                    if !output.is_empty() {
                        inputs.events.emit(ExecutionEvent::StepOutput {
                            job_id: job.id.clone(),
                            step_name: step.name.clone(),
                            output,
                        });
                    }

                    if outcome.success() {
                        inputs.events.emit(ExecutionEvent::StepCompleted {
                            job_id: job.id.clone(),
                            step_index: step.index,
                            step_name: step.name.clone(),
                            duration_ms,
                        });
                        continue;
                    }

                    warn!(
                        "[{}] step {} exited with status {}",
                        job.id, step.name, outcome.exit_status
                    );
                    final_state = Some(self.fail_at(job, step, outcome.exit_status, None, started_at, inputs));
                    break;
                }
                Some(Err(e)) => {
                    error!("[{}] step {} could not run: {}", job.id, step.name, e);
                    result.steps.push(StepRecord {
                        index: step.index,
                        name: step.name.clone(),
                        exit_status: NO_EXIT_STATUS,
                        duration_ms,
                        output: String::new(),
                        error: Some(e.to_string()),
                    });
                    final_state = Some(self.fail_at(
                        job,
                        step,
                        NO_EXIT_STATUS,
                        Some(e.to_string()),
                        started_at,
                        inputs,
                    ));
                    break;
                }
            }
        }

        if let Err(e) = context.close() {
            warn!("Failed to remove workspace for job {}: {}", job.id, e);
        }

        result.state = final_state.unwrap_or_else(|| JobState::Success {
            started_at,
            finished_at: Utc::now(),
        });
        info!("Job {} finished: {}", job.id, result.describe());
        self.finish(&result, inputs);
        result
    }

    /// Run a step, bounded by its timeout if it has one
    async fn run_with_timeout(
        &self,
        step: &Step,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError> {
        match self.timeout_for(step) {
            Some(secs) => timeout(Duration::from_secs(secs), self.runner.run_step(step, env))
                .await
                .map_err(|_| RunnerError::Timeout(secs))?,
            None => self.runner.run_step(step, env).await,
        }
    }

    fn timeout_for(&self, step: &Step) -> Option<u64> {
        self.settings.step_timeout_secs.or(step.timeout_secs)
    }

    fn fail_at(
        &self,
        job: &Job,
        step: &Step,
        exit_status: i32,
        error: Option<String>,
        started_at: chrono::DateTime<Utc>,
        inputs: &JobInputs,
    ) -> JobState {
        inputs.events.emit(ExecutionEvent::StepFailed {
            job_id: job.id.clone(),
            step_index: step.index,
            step_name: step.name.clone(),
            exit_status,
            error: error.clone(),
        });

        JobState::Failed {
            step_index: step.index,
            step_name: step.name.clone(),
            exit_status,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn finish(&self, result: &JobResult, inputs: &JobInputs) {
        inputs.events.emit(ExecutionEvent::JobFinished {
            job_id: result.job_id.clone(),
            state: result.state.clone(),
        });
    }
}

/// Keep the last `max_lines` lines of `text`
fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
