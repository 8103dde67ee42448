//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;
use std::path::PathBuf;

/// Run a workflow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Trigger event (push, pull_request, pull_request_review)
    #[arg(short, long, default_value = "push")]
    pub event: String,

    /// Extra workflow environment (key=value)
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Only run these jobs (repeatable)
    #[arg(short, long = "job")]
    pub jobs: Vec<String>,

    /// Only run jobs whose platform matches this machine
    #[arg(long)]
    pub host_only: bool,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Parallel)]
    pub strategy: SchedulingStrategyArg,

    /// Job limit for the parallel-limited strategy
    #[arg(long, default_value_t = 4)]
    pub max_jobs: usize,

    /// Timeout for every step in seconds, replacing workflow values
    #[arg(long)]
    pub step_timeout: Option<u64>,

    /// Source tree that checkout copies (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Don't save execution to history
    #[arg(long)]
    pub no_history: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    pub fn scheduling_strategy(&self) -> SchedulingStrategy {
        match self.strategy {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => {
                SchedulingStrategy::LimitedParallel(self.max_jobs)
            }
        }
    }
}

/// Validate a workflow file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List workflows that have run before
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show execution counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show execution history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent executions to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single execution in detail
    #[arg(long)]
    pub execution_id: Option<String>,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
