//! Configuration-level pipeline errors
//!
//! These are raised before any job is scheduled. Step and job failures are
//! never reported through this type; they live in [`crate::core::JobResult`].

use thiserror::Error;

/// Errors that reject a pipeline invocation as a whole
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unsupported trigger '{0}' (expected one of: push, pull_request, pull_request_review)")]
    UnsupportedTrigger(String),

    #[error("Workflow '{workflow}' is not triggered by '{trigger}'")]
    TriggerNotSubscribed { workflow: String, trigger: String },

    #[error("Workflow '{0}' declares no jobs")]
    EmptyPipeline(String),

    #[error("Job '{0}' declares no steps")]
    EmptyJob(String),

    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    #[error("No jobs left to schedule after filtering")]
    NothingScheduled,
}
