//! Built-in implementations of reusable actions

use crate::core::{ActionRef, Pipeline, StepAction, StepEnvironment};
use crate::runner::{RunnerError, StepOutcome};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Name of the checkout action
pub const CHECKOUT: &str = "actions/checkout";

/// Entries never copied by checkout
const CHECKOUT_SKIP: &[&str] = &[".git", "target"];

/// Resolves `uses:` references to built-in behavior
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry;

impl ActionRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Whether `action` has a built-in implementation
    pub fn is_supported(&self, action: &ActionRef) -> bool {
        action.name == CHECKOUT
    }

    /// `(job id, step name, action)` for every `uses:` step with no built-in
    /// implementation, in declaration order
    pub fn unsupported_steps(&self, pipeline: &Pipeline) -> Vec<(String, String, ActionRef)> {
        pipeline
            .jobs
            .iter()
            .flat_map(|job| job.steps.iter().map(move |step| (job, step)))
            .filter_map(|(job, step)| match &step.action {
                StepAction::Uses { action, .. } if !self.is_supported(action) => {
                    Some((job.id.clone(), step.name.clone(), action.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Run `action` with its `with:` parameters inside the step environment
    pub async fn invoke(
        &self,
        action: &ActionRef,
        with: &HashMap<String, String>,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError> {
        match action.name.as_str() {
            CHECKOUT => checkout(with, env).await,
            _ => Err(RunnerError::UnsupportedAction(action.to_string())),
        }
    }
}

/// Copy the source tree into the job workspace (or `with.path` below it)
async fn checkout(
    with: &HashMap<String, String>,
    env: &StepEnvironment,
) -> Result<StepOutcome, RunnerError> {
    for key in with.keys().filter(|k| k.as_str() != "path") {
        debug!("[{}] checkout ignores parameter '{}'", env.job_id, key);
    }

    let target = match with.get("path") {
        Some(path) => {
            let relative = Path::new(path);
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(RunnerError::Workspace(format!(
                    "checkout path '{}' must stay inside the workspace",
                    path
                )));
            }
            env.workspace.join(relative)
        }
        None => env.workspace.clone(),
    };

    let source = env.source_dir.clone();
    let destination = target.clone();
    let workspace = env.workspace.clone();
    let copied = tokio::task::spawn_blocking(move || {
        let skip_root = workspace.canonicalize()?;
        copy_tree(&source, &destination, &skip_root)
    })
    .await
    .map_err(|e| RunnerError::Workspace(format!("checkout task failed: {}", e)))??;

    info!(
        "[{}] checked out {} files into {}",
        env.job_id,
        copied,
        target.display()
    );

    Ok(StepOutcome::ok(format!(
        "Checked out {} files from {} into {}",
        copied,
        env.source_dir.display(),
        target.display()
    )))
}

/// Recursively copy regular files, skipping VCS/build dirs and the workspace itself
fn copy_tree(source: &Path, target: &Path, skip_root: &Path) -> io::Result<usize> {
    fs::create_dir_all(target)?;
    let mut copied = 0;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        if CHECKOUT_SKIP.iter().any(|skip| name == *skip) {
            continue;
        }

        let path: PathBuf = entry.path();
        let file_type = entry.file_type()?;
        let destination = target.join(&name);

        if file_type.is_dir() {
            if path.canonicalize()? == skip_root {
                continue;
            }
            copied += copy_tree(&path, &destination, skip_root)?;
        } else if file_type.is_file() {
            fs::copy(&path, &destination)?;
            copied += 1;
        }
    }

    Ok(copied)
}
