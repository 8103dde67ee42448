//! Command-line interface

pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Run CI workflows locally across a platform matrix
#[derive(Debug, Parser, Clone)]
#[command(name = "cirun")]
#[command(version)]
#[command(about = "Run CI workflows locally across a platform matrix", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (and full details in history)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print every event as it happens, with each step's output once it finishes
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a workflow for a trigger event
    Run(RunCommand),

    /// Validate a workflow file
    Validate(ValidateCommand),

    /// List workflows in the run history
    List(ListCommand),

    /// Show execution history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
