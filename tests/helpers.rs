//! Test utility functions for cirun

#![allow(dead_code)]

use async_trait::async_trait;
use cirun::core::config::WorkflowConfig;
use cirun::core::{
    ExecutionStatus, JobResult, JobState, Pipeline, PipelineError, PipelineResult, Step,
    StepEnvironment,
};
use cirun::execution::{CancelHandle, ExecutionEngine, ExecutionEvent, SchedulingStrategy};
use cirun::runner::{RunnerError, StepOutcome, StepRunner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The workflow shipped under `workflows/rust.yml`
pub const RUST_WORKFLOW: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/workflows/rust.yml"));

pub const LINUX_STEPS: &[&str] = &["Checkout", "Install dependencies", "Build", "Lint", "Format", "Test"];
pub const WINDOWS_STEPS: &[&str] = &["Checkout", "Build", "Lint", "Format", "Test"];

/// Load the reference workflow as a pipeline
pub fn rust_pipeline() -> Pipeline {
    WorkflowConfig::from_yaml(RUST_WORKFLOW)
        .expect("reference workflow should parse")
        .to_pipeline()
}

/// Parse a workflow from YAML and convert it
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    WorkflowConfig::from_yaml(yaml)
        .expect("workflow should parse")
        .to_pipeline()
}

type StepKey = (String, String);

fn key(job: &str, step: &str) -> StepKey {
    (job.to_string(), step.to_string())
}

/// What the scripted runner saw for one step invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub job_id: String,
    pub step_name: String,
    pub env: HashMap<String, String>,
    pub workspace: std::path::PathBuf,
}

/// Mock runner that succeeds unless scripted otherwise
///
/// Outcomes are keyed by `(job id, step name)`. Every invocation is recorded,
/// so tests can check which steps ran and in what order.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    exit_codes: Arc<HashMap<StepKey, i32>>,
    errors: Arc<HashMap<StepKey, String>>,
    delays: Arc<HashMap<StepKey, Duration>>,
    default_delay: Option<Duration>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step` of `job` exit with `code`
    pub fn fail(mut self, job: &str, step: &str, code: i32) -> Self {
        Arc::make_mut(&mut self.exit_codes).insert(key(job, step), code);
        self
    }

    /// Make `step` of `job` fail before producing an exit status
    pub fn error(mut self, job: &str, step: &str, message: &str) -> Self {
        Arc::make_mut(&mut self.errors).insert(key(job, step), message.to_string());
        self
    }

    /// Make `step` of `job` take `delay`
    pub fn delay(mut self, job: &str, step: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(key(job, step), delay);
        self
    }

    /// Make every step without its own delay take `delay`
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Step names that ran for `job`, in order
    pub fn steps_run(&self, job: &str) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|i| i.job_id == job)
            .map(|i| i.step_name)
            .collect()
    }

    pub fn invocation(&self, job: &str, step: &str) -> Option<Invocation> {
        self.invocations()
            .into_iter()
            .find(|i| i.job_id == job && i.step_name == step)
    }
}

#[async_trait]
impl StepRunner for ScriptedRunner {
    async fn run_step(
        &self,
        step: &Step,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError> {
        let step_key = key(&env.job_id, &step.name);
        self.invocations.lock().unwrap().push(Invocation {
            job_id: env.job_id.clone(),
            step_name: step.name.clone(),
            env: env.env.clone(),
            workspace: env.workspace.clone(),
        });

        if let Some(delay) = self.delays.get(&step_key).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.errors.get(&step_key) {
            return Err(RunnerError::Workspace(message.clone()));
        }

        match self.exit_codes.get(&step_key) {
            Some(code) => Ok(StepOutcome::exited(*code)),
            None => Ok(StepOutcome::ok(format!("{} ok", step.name))),
        }
    }
}

/// Options for a scripted test run
#[derive(Clone)]
pub struct TestRun {
    pub trigger: String,
    pub strategy: SchedulingStrategy,
    pub step_timeout: Option<u64>,
    pub cancel: CancelHandle,
}

impl Default for TestRun {
    fn default() -> Self {
        Self {
            trigger: "push".to_string(),
            strategy: SchedulingStrategy::Parallel,
            step_timeout: None,
            cancel: CancelHandle::new(),
        }
    }
}

/// Run a pipeline with the scripted runner, collecting emitted events
pub async fn run_with(
    pipeline: &Pipeline,
    runner: ScriptedRunner,
    options: TestRun,
) -> Result<PipelineTestResult, PipelineError> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let source = tempfile::tempdir().expect("source dir");
    let mut engine = ExecutionEngine::new(runner, options.strategy)
        .with_source_dir(source.path())
        .with_step_timeout(options.step_timeout);
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let start = std::time::Instant::now();
    let result = engine.run(&options.trigger, pipeline, &options.cancel).await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let events = events.lock().unwrap().clone();
    Ok(PipelineTestResult {
        result,
        events,
        duration_ms,
    })
}

/// Run a pipeline for `trigger` with default options
pub async fn run_pipeline(
    pipeline: &Pipeline,
    runner: ScriptedRunner,
    trigger: &str,
) -> Result<PipelineTestResult, PipelineError> {
    run_with(
        pipeline,
        runner,
        TestRun {
            trigger: trigger.to_string(),
            ..TestRun::default()
        },
    )
    .await
}

/// Test result from running a pipeline
#[derive(Debug, Clone)]
pub struct PipelineTestResult {
    pub result: PipelineResult,
    pub events: Vec<ExecutionEvent>,
    pub duration_ms: u64,
}

impl PipelineTestResult {
    pub fn status(&self) -> ExecutionStatus {
        self.result.status
    }

    pub fn job(&self, job_id: &str) -> &JobResult {
        self.result
            .job(job_id)
            .unwrap_or_else(|| panic!("Job '{}' not found in result", job_id))
    }

    /// Names of steps that have a record for `job_id`
    pub fn recorded_steps(&self, job_id: &str) -> Vec<String> {
        self.job(job_id).steps.iter().map(|s| s.name.clone()).collect()
    }

    /// Job IDs in the order their `JobFinished` events arrived
    pub fn finish_order(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ExecutionEvent::JobFinished { job_id, .. } => Some(job_id.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Assert the job succeeded and ran exactly `steps`
pub fn assert_job_succeeded(result: &PipelineTestResult, job_id: &str, steps: &[&str]) {
    let job = result.job(job_id);
    assert!(
        job.is_success(),
        "Job '{}' should have succeeded, but was: {}",
        job_id,
        job.describe()
    );
    assert_eq!(result.recorded_steps(job_id), steps, "steps recorded for '{}'", job_id);
}

/// Assert the job failed at `step` with `exit_status`
pub fn assert_job_failed_at(result: &PipelineTestResult, job_id: &str, step: &str, exit_status: i32) {
    let job = result.job(job_id);
    match &job.state {
        JobState::Failed {
            step_name,
            exit_status: actual,
            ..
        } => {
            assert_eq!(step_name, step, "failing step of '{}'", job_id);
            assert_eq!(*actual, exit_status, "exit status of '{}'", job_id);
        }
        other => panic!("Job '{}' should have failed at '{}', but was {:?}", job_id, step, other),
    }
}

/// Assert the job was cancelled
pub fn assert_job_cancelled(result: &PipelineTestResult, job_id: &str) {
    let job = result.job(job_id);
    assert!(
        matches!(job.state, JobState::Cancelled { .. }),
        "Job '{}' should have been cancelled, but was {:?}",
        job_id,
        job.state
    );
}
