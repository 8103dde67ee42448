//! Step domain model

use crate::core::{
    config::{minutes_to_secs, StepConfig},
    platform::{Platform, Shell},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Reference to a reusable, externally defined action (`owner/name@ref`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    /// Action name without the version suffix, e.g. `actions/checkout`
    pub name: String,

    /// Version, branch, or tag after `@`
    pub version: Option<String>,
}

fn action_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)*)(?:@([A-Za-z0-9_./-]+))?$")
            .expect("valid action reference regex")
    })
}

impl ActionRef {
    /// Parse `owner/name[/path][@ref]`
    pub fn parse(reference: &str) -> Result<Self, String> {
        let captures = action_ref_pattern()
            .captures(reference.trim())
            .ok_or_else(|| format!("Malformed action reference: '{}'", reference))?;

        Ok(Self {
            name: captures[1].to_string(),
            version: captures.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// What a step does when it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Literal command line executed in the job's shell
    Run { command: String },
    /// Reusable action invocation
    Uses {
        action: ActionRef,
        with: HashMap<String, String>,
    },
}

/// A single step in a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Zero-based position within the job
    pub index: usize,

    /// Display label
    pub name: String,

    /// Execution directive
    pub action: StepAction,

    /// Shell override for `run` steps
    pub shell: Option<Shell>,

    /// Directory relative to the job workspace
    pub working_directory: Option<String>,

    /// Step-level environment
    pub env: HashMap<String, String>,

    /// Timeout in seconds (None = unbounded)
    pub timeout_secs: Option<u64>,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig, index: usize, defaults: &StepDefaults) -> Self {
        let action = match (&config.run, &config.uses) {
            (Some(command), _) => StepAction::Run {
                command: command.clone(),
            },
            (None, Some(uses)) => StepAction::Uses {
                action: ActionRef::parse(uses).unwrap_or_else(|_| ActionRef {
                    name: uses.clone(),
                    version: None,
                }),
                with: config.with_as_string_map(),
            },
            (None, None) => StepAction::Run {
                command: String::new(),
            },
        };

        let name = config
            .name
            .clone()
            .unwrap_or_else(|| default_label(&action));

        Step {
            index,
            name,
            action,
            shell: config.shell.as_deref().and_then(|s| s.parse().ok()),
            working_directory: config.working_directory.clone(),
            env: config.env_as_string_map(),
            timeout_secs: config
                .timeout_minutes
                .map(minutes_to_secs)
                .or(defaults.timeout_secs),
        }
    }

    /// A `run` step with no overrides
    pub fn run(index: usize, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::with_action(
            index,
            name,
            StepAction::Run {
                command: command.into(),
            },
        )
    }

    /// A `uses` step with no parameters
    pub fn uses(index: usize, name: impl Into<String>, action: ActionRef) -> Self {
        Self::with_action(
            index,
            name,
            StepAction::Uses {
                action,
                with: HashMap::new(),
            },
        )
    }

    fn with_action(index: usize, name: impl Into<String>, action: StepAction) -> Self {
        Self {
            index,
            name: name.into(),
            action,
            shell: None,
            working_directory: None,
            env: HashMap::new(),
            timeout_secs: None,
        }
    }

    /// Shell this step runs under on the given platform
    pub fn shell_for(&self, platform: &Platform) -> Shell {
        self.shell.unwrap_or_else(|| platform.default_shell())
    }
}

fn default_label(action: &StepAction) -> String {
    match action {
        StepAction::Run { command } => {
            format!("Run {}", command.lines().next().unwrap_or_default().trim())
        }
        StepAction::Uses { action, .. } => format!("Run {}", action),
    }
}

/// Values a step inherits when its config leaves them unset
#[derive(Debug, Clone, Default)]
pub struct StepDefaults {
    pub timeout_secs: Option<u64>,
}
