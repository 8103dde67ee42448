//! Pipeline domain model

use crate::core::{
    config::{minutes_to_secs, WorkflowConfig},
    error::PipelineError,
    job::Job,
    step::StepDefaults,
    trigger::TriggerKind,
};
use std::collections::HashMap;

/// A workflow ready to run: triggers, shared environment, and the job matrix
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Workflow name
    pub name: String,

    /// Events this workflow subscribes to
    pub triggers: Vec<TriggerKind>,

    /// Environment injected identically into every job
    pub env: HashMap<String, String>,

    /// Jobs in declaration order
    pub jobs: Vec<Job>,
}

/// Restricts which jobs of a pipeline get scheduled
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Only these job IDs (empty = all)
    pub ids: Vec<String>,

    /// Only jobs whose platform matches the host OS
    pub host_only: bool,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config.default_timeout_minutes.map(minutes_to_secs),
        };

        let mut triggers = Vec::new();
        for kind in config
            .trigger_names()
            .iter()
            .filter_map(|name| name.parse::<TriggerKind>().ok())
        {
            if !triggers.contains(&kind) {
                triggers.push(kind);
            }
        }

        Pipeline {
            name: config.name.clone(),
            triggers,
            env: config.env_as_string_map(),
            jobs: config
                .jobs
                .iter()
                .map(|job| Job::from_config(job, &defaults))
                .collect(),
        }
    }

    /// Create an empty pipeline subscribed to the given triggers
    pub fn new(name: impl Into<String>, triggers: Vec<TriggerKind>) -> Self {
        Self {
            name: name.into(),
            triggers,
            env: HashMap::new(),
            jobs: Vec::new(),
        }
    }

    /// Append a job to the matrix
    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Set a pipeline-wide environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Get a job by ID
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Whether this workflow runs for the given trigger
    pub fn subscribes_to(&self, kind: TriggerKind) -> bool {
        self.triggers.contains(&kind)
    }

    /// Copy of this pipeline containing only the jobs selected by `filter`
    pub fn filtered(&self, filter: &JobFilter) -> Result<Pipeline, PipelineError> {
        for id in &filter.ids {
            if self.job(id).is_none() {
                return Err(PipelineError::UnknownJob(id.clone()));
            }
        }

        let jobs: Vec<Job> = self
            .jobs
            .iter()
            .filter(|job| filter.ids.is_empty() || filter.ids.contains(&job.id))
            .filter(|job| !filter.host_only || job.platform.matches_host())
            .cloned()
            .collect();

        if jobs.is_empty() {
            return Err(PipelineError::NothingScheduled);
        }

        Ok(Pipeline {
            name: self.name.clone(),
            triggers: self.triggers.clone(),
            env: self.env.clone(),
            jobs,
        })
    }
}
