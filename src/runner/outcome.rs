//! Step outcome and runner error types

use crate::core::NO_EXIT_STATUS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for step runners
///
/// Any of these turns into a step failure with exit status `-1`.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Cancelled")]
    Cancelled,

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a finished step reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Process exit status (0 = success)
    pub exit_status: i32,

    /// Captured stdout
    pub stdout: String,

    /// Captured stderr
    pub stderr: String,
}

impl StepOutcome {
    /// A successful outcome with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// An outcome with the given exit status and no output
    pub fn exited(exit_status: i32) -> Self {
        Self {
            exit_status,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Exit status is the sole success signal
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// stdout followed by stderr
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

impl Default for StepOutcome {
    fn default() -> Self {
        Self::exited(NO_EXIT_STATUS)
    }
}
