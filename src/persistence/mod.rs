//! Persistence layer for pipeline execution history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteExecutionStore;

pub use crate::core::ExecutionStatus;
use crate::core::{JobResult, PipelineResult, TriggerKind};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-job line of an execution summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub platform: String,
    /// Terminal state label (`SUCCESS`, `FAILED`, `CANCELLED`)
    pub state: String,
    /// Human-readable outcome, e.g. "failed at step 2 (Lint), exit status 101"
    pub detail: String,
}

impl From<&JobResult> for JobSummary {
    fn from(job: &JobResult) -> Self {
        Self {
            job_id: job.job_id.clone(),
            platform: job.platform.clone(),
            state: job.state.label().to_string(),
            detail: job.describe(),
        }
    }
}

/// Summary of a pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline name
    pub pipeline_name: String,

    /// Trigger that started the execution
    pub trigger: TriggerKind,

    /// Execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: DateTime<Utc>,

    /// When execution completed (if complete)
    pub completed_at: Option<DateTime<Utc>>,

    pub total_jobs: usize,
    pub succeeded_jobs: usize,
    pub failed_jobs: usize,

    /// Jobs in declaration order
    pub jobs: Vec<JobSummary>,
}

impl ExecutionSummary {
    /// Wall-clock duration, if the execution completed
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a pipeline execution
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()>;

    /// Load an execution by ID
    async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>>;

    /// List executions for a pipeline, newest first
    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>>;

    /// Most recent executions across all pipelines, newest first
    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionSummary>>;

    /// List all pipeline names, sorted
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    executions: RwLock<HashMap<Uuid, ExecutionSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut executions: Vec<ExecutionSummary>) -> Vec<ExecutionSummary> {
    executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    executions
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_execution(&self, execution: &ExecutionSummary) -> Result<()> {
        let mut execs = self.executions.write().await;
        execs.insert(execution.execution_id, execution.clone());
        Ok(())
    }

    async fn load_execution(&self, execution_id: Uuid) -> Result<Option<ExecutionSummary>> {
        let execs = self.executions.read().await;
        Ok(execs.get(&execution_id).cloned())
    }

    async fn list_executions(&self, pipeline_name: &str) -> Result<Vec<ExecutionSummary>> {
        let execs = self.executions.read().await;
        Ok(newest_first(
            execs
                .values()
                .filter(|e| e.pipeline_name == pipeline_name)
                .cloned()
                .collect(),
        ))
    }

    async fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionSummary>> {
        let execs = self.executions.read().await;
        let mut recent = newest_first(execs.values().cloned().collect());
        recent.truncate(limit);
        Ok(recent)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let execs = self.executions.read().await;
        let mut names: Vec<String> = execs.values().map(|e| e.pipeline_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Create a summary from a finished run
pub fn create_summary(result: &PipelineResult) -> ExecutionSummary {
    ExecutionSummary {
        execution_id: result.execution_id,
        pipeline_name: result.pipeline_name.clone(),
        trigger: result.trigger,
        status: result.status,
        started_at: result.started_at,
        completed_at: result.completed_at,
        total_jobs: result.jobs.len(),
        succeeded_jobs: result.succeeded_jobs(),
        failed_jobs: result.failed_jobs(),
        jobs: result.jobs.iter().map(JobSummary::from).collect(),
    }
}
