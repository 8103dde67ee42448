//! Execution state and result models

use crate::core::{job::Job, trigger::TriggerKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Exit status recorded when a step produced no exit code
/// (spawn failure, timeout, cancellation, signal)
pub const NO_EXIT_STATUS: i32 = -1;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every job succeeded
    Completed,
    /// At least one job failed
    Failed,
    /// The invocation was cancelled before every job finished
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "Pending",
            ExecutionStatus::Running => "Running",
            ExecutionStatus::Completed => "Completed",
            ExecutionStatus::Failed => "Failed",
            ExecutionStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ExecutionStatus::Pending),
            "Running" => Ok(ExecutionStatus::Running),
            "Completed" => Ok(ExecutionStatus::Completed),
            "Failed" => Ok(ExecutionStatus::Failed),
            "Cancelled" => Ok(ExecutionStatus::Cancelled),
            other => Err(format!("Unknown execution status: {}", other)),
        }
    }
}

/// State of a single job
///
/// Moves `Pending -> Running -> {Success, Failed, Cancelled}` and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is waiting to be scheduled
    Pending,
    /// Job is executing its steps
    Running { started_at: DateTime<Utc> },
    /// Every step succeeded
    Success {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// The step at `step_index` failed; later steps never ran
    Failed {
        step_index: usize,
        step_name: String,
        exit_status: i32,
        error: Option<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Cancelled while waiting (`step_index: None`) or during a step
    Cancelled {
        step_index: Option<usize>,
        cancelled_at: DateTime<Utc>,
    },
}

impl JobState {
    /// Check if job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Success { .. } | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobState::Success { .. })
    }

    /// Short uppercase label for display and storage
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running { .. } => "RUNNING",
            JobState::Success { .. } => "SUCCESS",
            JobState::Failed { .. } => "FAILED",
            JobState::Cancelled { .. } => "CANCELLED",
        }
    }
}

/// What happened when a single step ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub exit_status: i32,
    pub duration_ms: u64,
    /// Tail of combined stdout and stderr
    pub output: String,
    /// Runner-level error, if the step could not run to completion
    pub error: Option<String>,
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub platform: String,
    pub state: JobState,
    /// Records for every step that started, in order
    pub steps: Vec<StepRecord>,
}

impl JobResult {
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            platform: job.platform.label.clone(),
            state: JobState::Pending,
            steps: Vec::new(),
        }
    }

    /// A job that never started because the invocation was cancelled
    pub fn cancelled_before_start(job: &Job) -> Self {
        let mut result = Self::new(job);
        result.state = JobState::Cancelled {
            step_index: None,
            cancelled_at: Utc::now(),
        };
        result
    }

    /// A job whose execution context died (e.g. its task panicked)
    pub fn aborted(job: &Job, error: String) -> Self {
        let now = Utc::now();
        let mut result = Self::new(job);
        result.state = JobState::Failed {
            step_index: 0,
            step_name: job.steps.first().map(|s| s.name.clone()).unwrap_or_default(),
            exit_status: NO_EXIT_STATUS,
            error: Some(error),
            started_at: now,
            finished_at: now,
        };
        result
    }

    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// Record of the step that failed this job, if any
    pub fn failed_step(&self) -> Option<&StepRecord> {
        match &self.state {
            JobState::Failed { step_index, .. } => {
                self.steps.iter().find(|s| s.index == *step_index)
            }
            _ => None,
        }
    }

    /// Whether the step at `index` was started
    pub fn ran_step(&self, index: usize) -> bool {
        self.steps.iter().any(|s| s.index == index)
    }

    /// One-line description of the outcome
    pub fn describe(&self) -> String {
        match &self.state {
            JobState::Failed {
                step_index,
                step_name,
                exit_status,
                error,
                ..
            } => match error {
                Some(error) => format!(
                    "failed at step {} ({}): {}",
                    step_index + 1,
                    step_name,
                    error
                ),
                None => format!(
                    "failed at step {} ({}), exit status {}",
                    step_index + 1,
                    step_name,
                    exit_status
                ),
            },
            JobState::Cancelled {
                step_index: Some(index),
                ..
            } => format!("cancelled at step {}", index + 1),
            JobState::Cancelled { step_index: None, .. } => "cancelled before start".to_string(),
            JobState::Success { .. } => "success".to_string(),
            JobState::Running { .. } => "running".to_string(),
            JobState::Pending => "pending".to_string(),
        }
    }
}

/// Aggregate outcome of one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Unique execution ID
    pub execution_id: Uuid,

    pub pipeline_name: String,

    pub trigger: TriggerKind,

    pub status: ExecutionStatus,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// One result per scheduled job, in declaration order
    pub jobs: Vec<JobResult>,
}

impl PipelineResult {
    /// Aggregate status of a set of job results
    ///
    /// `Completed` iff every job succeeded. Any failure wins over cancellation.
    pub fn aggregate(jobs: &[JobResult]) -> ExecutionStatus {
        if jobs.iter().all(JobResult::is_success) {
            ExecutionStatus::Completed
        } else if jobs
            .iter()
            .any(|j| matches!(j.state, JobState::Failed { .. }))
        {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Cancelled
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// Get a job result by ID
    pub fn job(&self, job_id: &str) -> Option<&JobResult> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    pub fn succeeded_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_success()).count()
    }

    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| matches!(j.state, JobState::Failed { .. }))
            .count()
    }
}
