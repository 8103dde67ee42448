//! Job domain model

use crate::core::{
    config::{minutes_to_secs, JobConfig},
    platform::Platform,
    step::{Step, StepDefaults},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A platform-bound, ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Target platform
    pub platform: Platform,

    /// Job-level environment
    pub env: HashMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Job {
    /// Create a job from configuration
    pub fn from_config(config: &JobConfig, defaults: &StepDefaults) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config
                .timeout_minutes
                .map(minutes_to_secs)
                .or(defaults.timeout_secs),
        };

        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| Step::from_config(step, index, &defaults))
            .collect();

        Job {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            platform: Platform::from_label(&config.runs_on),
            env: config.env_as_string_map(),
            steps,
        }
    }

    /// Create a job with no environment
    pub fn new(id: impl Into<String>, runs_on: &str, steps: Vec<Step>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            platform: Platform::from_label(runs_on),
            env: HashMap::new(),
            steps,
        }
    }

    /// Get a step by display label
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}
