//! Main execution engine - runs every job of a pipeline for one trigger

use crate::{
    core::{
        ExecutionStatus, JobResult, JobState, Pipeline, PipelineError, PipelineResult, Trigger,
        TriggerKind,
    },
    execution::{
        executor::{ExecutorSettings, JobExecutor, JobInputs},
        CancelHandle, ExecutionScheduler, SchedulingStrategy,
    },
    runner::StepRunner,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        trigger: TriggerKind,
        job_count: usize,
    },
    JobStarted {
        job_id: String,
        platform: String,
    },
    StepStarted {
        job_id: String,
        step_index: usize,
        step_name: String,
    },
    StepOutput {
        job_id: String,
        step_name: String,
        output: String,
    },
    StepCompleted {
        job_id: String,
        step_index: usize,
        step_name: String,
        duration_ms: u64,
    },
    StepFailed {
        job_id: String,
        step_index: usize,
        step_name: String,
        exit_status: i32,
        error: Option<String>,
    },
    JobFinished {
        job_id: String,
        state: JobState,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Fans events out to every registered handler
///
/// Handlers are called synchronously from whichever job task emits, so
/// events from different jobs may interleave.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Arc<Vec<EventHandler>>,
}

impl EventEmitter {
    pub fn new(handlers: Vec<EventHandler>) -> Self {
        Self {
            handlers: Arc::new(handlers),
        }
    }

    pub fn emit(&self, event: ExecutionEvent) {
        for handler in self.handlers.iter() {
            handler(event.clone());
        }
    }
}

/// A job slot: either a running task or a job that was never started
enum Scheduled {
    Spawned(JoinHandle<JobResult>),
    NotStarted(JobResult),
}

/// Main pipeline execution engine
pub struct ExecutionEngine<R> {
    runner: Arc<R>,
    scheduler: ExecutionScheduler,
    settings: ExecutorSettings,
    source_dir: PathBuf,
    event_handlers: Vec<EventHandler>,
}

impl<R: StepRunner + 'static> ExecutionEngine<R> {
    pub fn new(runner: R, strategy: SchedulingStrategy) -> Self {
        Self {
            runner: Arc::new(runner),
            scheduler: ExecutionScheduler::new(strategy),
            settings: ExecutorSettings::default(),
            source_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            event_handlers: Vec::new(),
        }
    }

    /// Directory that checkout copies into each job workspace
    pub fn with_source_dir(mut self, source_dir: impl Into<PathBuf>) -> Self {
        self.source_dir = source_dir.into();
        self
    }

    /// Timeout applied to every step, replacing per-step values
    pub fn with_step_timeout(mut self, secs: Option<u64>) -> Self {
        self.settings.step_timeout_secs = secs;
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Check that `event` may start `pipeline` without running anything
    pub fn check(event: &str, pipeline: &Pipeline) -> Result<Trigger, PipelineError> {
        let trigger = Trigger::parse(event)?;
        let kind = trigger.kind;

        if !pipeline.subscribes_to(kind) {
            return Err(PipelineError::TriggerNotSubscribed {
                workflow: pipeline.name.clone(),
                trigger: kind.to_string(),
            });
        }

        if pipeline.jobs.is_empty() {
            return Err(PipelineError::EmptyPipeline(pipeline.name.clone()));
        }

        if let Some(job) = pipeline.jobs.iter().find(|job| job.steps.is_empty()) {
            return Err(PipelineError::EmptyJob(job.id.clone()));
        }

        Ok(trigger)
    }

    /// Run every job of `pipeline` in reaction to the `event` trigger
    ///
    /// Jobs start in declaration order as scheduler slots free up and run
    /// concurrently with each other. A failing job never stops its siblings;
    /// only `cancel` does.
    ///
    /// # Errors
    /// Returns `PipelineError` if the trigger is unsupported or not subscribed,
    /// or if the pipeline has no jobs or a job has no steps. Nothing runs in
    /// that case. Once jobs start, every outcome is reported in the result.
    pub async fn run(
        &self,
        event: &str,
        pipeline: &Pipeline,
        cancel: &CancelHandle,
    ) -> Result<PipelineResult, PipelineError> {
        let trigger = Self::check(event, pipeline).inspect_err(|e| {
            error!("Refusing to run pipeline {}: {}", pipeline.name, e);
        })?;
        let kind = trigger.kind;

        let execution_id = Uuid::new_v4();
        let started_at = trigger.received_at;
        let job_count = pipeline.jobs.len();

        info!(
            "Starting pipeline execution: {} ({}) on {}",
            pipeline.name, execution_id, kind
        );

        let events = EventEmitter::new(self.event_handlers.clone());
        events.emit(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            trigger: kind,
            job_count,
        });

        let executor = Arc::new(JobExecutor::new(self.runner.clone(), self.settings.clone()));
        let inputs = JobInputs {
            trigger: kind,
            pipeline_env: Arc::new(pipeline.env.clone()),
            source_dir: Arc::new(self.source_dir.clone()),
            cancel: cancel.clone(),
            events: events.clone(),
        };

        let slots = self.scheduler.slots(job_count);
        let mut scheduled = Vec::with_capacity(job_count);

        for job in &pipeline.jobs {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = slots.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                warn!("Job {} not started: execution cancelled", job.id);
                let result = JobResult::cancelled_before_start(job);
                events.emit(ExecutionEvent::JobFinished {
                    job_id: job.id.clone(),
                    state: result.state.clone(),
                });
                scheduled.push(Scheduled::NotStarted(result));
                continue;
            };

            let job = job.clone();
            let executor = executor.clone();
            let inputs = inputs.clone();
            scheduled.push(Scheduled::Spawned(tokio::spawn(async move {
                let _permit = permit;
                executor.execute(&job, &inputs).await
            })));
        }

        let mut results = Vec::with_capacity(job_count);
        for (job, slot) in pipeline.jobs.iter().zip(scheduled) {
            let result = match slot {
                Scheduled::NotStarted(result) => result,
                Scheduled::Spawned(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Job {} task did not complete: {}", job.id, e);
                        let result = JobResult::aborted(job, format!("job task aborted: {}", e));
                        events.emit(ExecutionEvent::JobFinished {
                            job_id: job.id.clone(),
                            state: result.state.clone(),
                        });
                        result
                    }
                },
            };
            results.push(result);
        }

        let status = PipelineResult::aggregate(&results);
        info!(
            "Pipeline execution finished: {} - {}",
            pipeline.name, status
        );
        events.emit(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        Ok(PipelineResult {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            trigger: kind,
            status,
            started_at,
            completed_at: Some(Utc::now()),
            jobs: results,
        })
    }
}
