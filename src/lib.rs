//! cirun - run CI workflows locally across a platform matrix

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod runner;

// Re-export commonly used types
pub use core::{ExecutionStatus, Job, JobResult, JobState, Pipeline, PipelineError, PipelineResult, Step, TriggerKind};
pub use execution::{CancelHandle, ExecutionEngine, ExecutionEvent, SchedulingStrategy};
pub use runner::{LocalRunner, StepRunner};
