//! Workflow configuration from YAML

use crate::core::{platform::Shell, step::ActionRef, trigger::TriggerKind, Pipeline};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

/// Trigger declaration under `on:`: a single event, a list, or a mapping
/// whose keys are event names (their values are ignored)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerSpec {
    Single(String),
    List(Vec<String>),
    Map(serde_yaml::Mapping),
}

impl TriggerSpec {
    /// Raw event names as written in the file
    pub fn names(&self) -> Vec<String> {
        match self {
            TriggerSpec::Single(name) => vec![name.clone()],
            TriggerSpec::List(names) => names.clone(),
            TriggerSpec::Map(map) => map.keys().map(value_to_string).collect(),
        }
    }
}

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Events that start this workflow
    #[serde(rename = "on", alias = "triggers")]
    pub on: TriggerSpec,

    /// Environment injected into every job
    #[serde(default)]
    env: HashMap<String, Value>,

    /// Default step timeout (in minutes)
    #[serde(default, alias = "default-timeout-minutes")]
    pub default_timeout_minutes: Option<u64>,

    /// Jobs, in declaration order
    pub jobs: Vec<JobConfig>,
}

/// Job configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job identifier
    pub id: String,

    /// Human-readable job name
    #[serde(default)]
    pub name: Option<String>,

    /// OS label of the target platform
    #[serde(rename = "runs-on", alias = "runs_on")]
    pub runs_on: String,

    /// Job-level environment (overrides workflow env)
    #[serde(default)]
    env: HashMap<String, Value>,

    /// Default timeout for this job's steps (in minutes)
    #[serde(default, alias = "timeout-minutes")]
    pub timeout_minutes: Option<u64>,

    /// Steps, in execution order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Display label
    #[serde(default)]
    pub name: Option<String>,

    /// Command line executed in the job's shell
    #[serde(default)]
    pub run: Option<String>,

    /// Reusable action reference (`owner/name@ref`)
    #[serde(default)]
    pub uses: Option<String>,

    /// Action parameters
    #[serde(default)]
    with: HashMap<String, Value>,

    /// Shell override for `run` steps
    #[serde(default)]
    pub shell: Option<String>,

    /// Directory relative to the job workspace
    #[serde(default, alias = "working-directory")]
    pub working_directory: Option<String>,

    /// Step-level environment (overrides job env)
    #[serde(default)]
    env: HashMap<String, Value>,

    /// Timeout for this step (in minutes)
    #[serde(default, alias = "timeout-minutes")]
    pub timeout_minutes: Option<u64>,
}

fn env_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid env name regex"))
}

fn job_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid job id regex"))
}

/// Render a scalar YAML value the way it would appear in an environment
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn to_string_map(values: &HashMap<String, Value>) -> HashMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect()
}

/// Seconds in `minutes`, saturating at `u64::MAX`
pub fn minutes_to_secs(minutes: u64) -> u64 {
    minutes.saturating_mul(60)
}

fn validate_timeout(scope: &str, timeout_minutes: Option<u64>) -> Result<()> {
    if let Some(minutes) = timeout_minutes {
        if minutes.checked_mul(60).is_none() {
            anyhow::bail!("{} has a timeout_minutes value that is too large: {}", scope, minutes);
        }
    }
    Ok(())
}

fn validate_env(scope: &str, env: &HashMap<String, Value>) -> Result<()> {
    for key in env.keys() {
        if !env_name_pattern().is_match(key) {
            anyhow::bail!("{} declares invalid environment variable name '{}'", scope, key);
        }
    }
    Ok(())
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Workflow name must not be empty");
        }

        let triggers = self.on.names();
        if triggers.is_empty() {
            anyhow::bail!("Workflow '{}' declares no triggers", self.name);
        }
        for trigger in &triggers {
            trigger.parse::<TriggerKind>()?;
        }

        validate_env("Workflow", &self.env)?;
        validate_timeout("Workflow", self.default_timeout_minutes)?;

        if self.jobs.is_empty() {
            anyhow::bail!("Workflow '{}' declares no jobs", self.name);
        }

        let mut seen_ids = HashSet::new();
        for job in &self.jobs {
            if !job_id_pattern().is_match(&job.id) {
                anyhow::bail!("Invalid job ID: '{}'", job.id);
            }
            if !seen_ids.insert(&job.id) {
                anyhow::bail!("Duplicate job ID: {}", job.id);
            }
            job.validate()?;
        }

        Ok(())
    }

    /// Raw trigger names as written under `on:`
    pub fn trigger_names(&self) -> Vec<String> {
        self.on.names()
    }

    /// Workflow environment as a string map
    pub fn env_as_string_map(&self) -> HashMap<String, String> {
        to_string_map(&self.env)
    }

    /// Total number of steps across all jobs
    pub fn step_count(&self) -> usize {
        self.jobs.iter().map(|job| job.steps.len()).sum()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}

impl JobConfig {
    fn validate(&self) -> Result<()> {
        if self.runs_on.trim().is_empty() {
            anyhow::bail!("Job '{}' has an empty runs-on label", self.id);
        }

        if self.steps.is_empty() {
            anyhow::bail!("Job '{}' declares no steps", self.id);
        }

        let scope = format!("Job '{}'", self.id);
        validate_env(&scope, &self.env)?;
        validate_timeout(&scope, self.timeout_minutes)?;

        for (index, step) in self.steps.iter().enumerate() {
            let scope = format!("Job '{}' step {}", self.id, index + 1);
            step.validate(&scope)?;
        }

        Ok(())
    }

    /// Job environment as a string map
    pub fn env_as_string_map(&self) -> HashMap<String, String> {
        to_string_map(&self.env)
    }
}

impl StepConfig {
    fn validate(&self, scope: &str) -> Result<()> {
        match (&self.run, &self.uses) {
            (Some(_), Some(_)) => anyhow::bail!("{} sets both 'run' and 'uses'", scope),
            (None, None) => anyhow::bail!("{} must set either 'run' or 'uses'", scope),
            (Some(run), None) if run.trim().is_empty() => {
                anyhow::bail!("{} has an empty 'run' command", scope)
            }
            (Some(_), None) => {}
            (None, Some(uses)) => {
                ActionRef::parse(uses).map_err(|e| anyhow::anyhow!("{}: {}", scope, e))?;
                if self.shell.is_some() {
                    anyhow::bail!("{} sets 'shell' on a 'uses' step", scope);
                }
            }
        }

        if let Some(shell) = &self.shell {
            shell
                .parse::<Shell>()
                .map_err(|e| anyhow::anyhow!("{}: {}", scope, e))?;
        }

        validate_timeout(scope, self.timeout_minutes)?;
        validate_env(scope, &self.env)
    }

    /// Action parameters as a string map
    pub fn with_as_string_map(&self) -> HashMap<String, String> {
        to_string_map(&self.with)
    }

    /// Step environment as a string map
    pub fn env_as_string_map(&self) -> HashMap<String, String> {
        to_string_map(&self.env)
    }
}
