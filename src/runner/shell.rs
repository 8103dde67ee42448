//! Shell command runner - executes `run` steps as subprocesses

use crate::core::{StepEnvironment, NO_EXIT_STATUS};
use crate::runner::{config::RunnerConfig, RunnerError, StepOutcome};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs command lines through the step's shell
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    config: RunnerConfig,
}

impl ShellCommandRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute `command` in the step's shell, working directory, and environment
    ///
    /// The child is killed if the returned future is dropped, so callers can
    /// impose timeouts and cancellation by racing it. On unix the command runs
    /// in its own process group and the whole group is killed, so processes
    /// the shell started do not outlive the step.
    ///
    /// # Errors
    /// Returns `RunnerError` if the working directory is missing or the shell
    /// cannot be spawned. A non-zero exit is not an error; it is reported
    /// through `StepOutcome::exit_status`.
    pub async fn execute(
        &self,
        command: &str,
        env: &StepEnvironment,
    ) -> Result<StepOutcome, RunnerError> {
        if !env.working_dir.is_dir() {
            return Err(RunnerError::Workspace(format!(
                "working directory {} does not exist",
                env.working_dir.display()
            )));
        }

        let (program, args) = env.shell.invocation(command);
        debug!(
            "[{}] {} {} (cwd: {})",
            env.job_id,
            program,
            command,
            env.working_dir.display()
        );

        let mut cmd = Command::new(program);
        if !self.config.inherit_env {
            cmd.env_clear();
            if let Some(path) = std::env::var_os("PATH") {
                cmd.env("PATH", path);
            }
        }

        cmd.args(&args)
            .envs(&env.env)
            .current_dir(&env.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let _group = ProcessGroup::of(&child);
        let output = child.wait_with_output().await?;

        let exit_status = output.status.code().unwrap_or(NO_EXIT_STATUS);
        if exit_status != 0 {
            warn!("[{}] command exited with status {}", env.job_id, exit_status);
        }

        Ok(StepOutcome {
            exit_status,
            stdout: self.keep_tail(&output.stdout),
            stderr: self.keep_tail(&output.stderr),
        })
    }

    /// Decode output lossily, keeping at most `max_output_bytes` from the end
    fn keep_tail(&self, bytes: &[u8]) -> String {
        let start = bytes.len().saturating_sub(self.config.max_output_bytes);
        String::from_utf8_lossy(&bytes[start..]).into_owned()
    }
}

/// Kills a step's process group when dropped
///
/// Dropped both on normal completion and when the step future is abandoned,
/// so background processes never survive their step.
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<libc::pid_t>,
}

impl ProcessGroup {
    fn of(child: &tokio::process::Child) -> Self {
        #[cfg(unix)]
        {
            Self {
                pgid: child.id().and_then(|id| libc::pid_t::try_from(id).ok()),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child;
            Self {}
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.pgid.filter(|pgid| *pgid > 1) {
                // SAFETY: killpg only sends a signal; an already empty group yields ESRCH
                let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
                if rc == 0 {
                    debug!("killed process group {}", pgid);
                }
            }
        }
    }
}
