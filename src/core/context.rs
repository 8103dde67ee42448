//! Job context - the ephemeral, job-scoped working environment
//!
//! Each job gets its own temporary workspace directory and environment.
//! Nothing here is shared between jobs, and the workspace is removed when
//! the context is closed or dropped.

use crate::core::{job::Job, platform::Shell, step::Step, trigger::TriggerKind};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Everything a runner needs to execute one step
#[derive(Debug, Clone)]
pub struct StepEnvironment {
    /// Job the step belongs to
    pub job_id: String,

    /// Shell for `run` steps
    pub shell: Shell,

    /// Directory the step runs in
    pub working_dir: PathBuf,

    /// Root of the job workspace
    pub workspace: PathBuf,

    /// Source tree checkout actions copy from
    pub source_dir: PathBuf,

    /// Fully layered environment variables
    pub env: HashMap<String, String>,
}

/// Execution context for a single job run
#[derive(Debug)]
pub struct JobContext {
    job_id: String,
    workspace: TempDir,
    source_dir: PathBuf,

    /// Pipeline env, then job env, then built-in variables
    env: HashMap<String, String>,
}

impl JobContext {
    /// Create a fresh workspace for `job`
    pub fn create(
        job: &Job,
        pipeline_env: &HashMap<String, String>,
        trigger: TriggerKind,
        source_dir: &Path,
    ) -> io::Result<Self> {
        let workspace = tempfile::Builder::new()
            .prefix(&format!("cirun-{}-", job.id))
            .tempdir()?;

        let mut env = pipeline_env.clone();
        env.extend(job.env.clone());
        env.insert("CI".to_string(), "true".to_string());
        env.insert("CIRUN_EVENT_NAME".to_string(), trigger.to_string());
        env.insert("CIRUN_JOB".to_string(), job.id.clone());
        env.insert(
            "CIRUN_WORKSPACE".to_string(),
            workspace.path().display().to_string(),
        );

        Ok(Self {
            job_id: job.id.clone(),
            workspace,
            source_dir: source_dir.to_path_buf(),
            env,
        })
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Environment for a step: job-level variables overlaid with the step's own
    pub fn step_env(&self, step: &Step) -> HashMap<String, String> {
        let mut env = self.env.clone();
        env.extend(step.env.clone());
        env
    }

    /// Resolve everything a runner needs for `step`
    pub fn step_environment(&self, step: &Step, job: &Job) -> StepEnvironment {
        let working_dir = match &step.working_directory {
            Some(dir) => self.workspace.path().join(dir),
            None => self.workspace.path().to_path_buf(),
        };

        StepEnvironment {
            job_id: self.job_id.clone(),
            shell: step.shell_for(&job.platform),
            working_dir,
            workspace: self.workspace.path().to_path_buf(),
            source_dir: self.source_dir.clone(),
            env: self.step_env(step),
        }
    }

    /// Discard the workspace
    pub fn close(self) -> io::Result<()> {
        self.workspace.close()
    }
}
