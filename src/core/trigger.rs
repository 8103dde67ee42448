//! Trigger events that start a pipeline run

use crate::core::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of external event that starts a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Code pushed to a branch
    Push,
    /// Change request opened or updated
    PullRequest,
    /// Review submitted on a change request
    PullRequestReview,
}

impl TriggerKind {
    /// Every supported trigger kind
    pub const ALL: [TriggerKind; 3] = [
        TriggerKind::Push,
        TriggerKind::PullRequest,
        TriggerKind::PullRequestReview,
    ];

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Push => "push",
            TriggerKind::PullRequest => "pull_request",
            TriggerKind::PullRequestReview => "pull_request_review",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TriggerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == trimmed)
            .ok_or_else(|| PipelineError::UnsupportedTrigger(s.to_string()))
    }
}

/// A single received trigger, consumed once per pipeline invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub received_at: DateTime<Utc>,
}

impl Trigger {
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            received_at: Utc::now(),
        }
    }

    /// Parse a trigger from its wire name
    pub fn parse(name: &str) -> Result<Self, PipelineError> {
        Ok(Self::new(name.parse()?))
    }
}
