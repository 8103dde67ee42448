//! Core domain models for the workflow runner
//!
//! This module defines the fundamental data structures that represent
//! workflows, jobs, steps, triggers, and their results.

pub mod config;
pub mod context;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod platform;
pub mod state;
pub mod step;
pub mod trigger;

pub use context::*;
pub use error::PipelineError;
pub use job::*;
pub use pipeline::*;
pub use platform::*;
pub use state::*;
pub use step::*;
pub use trigger::*;
