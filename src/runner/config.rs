//! Local runner configuration

/// Configuration for the local step runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum bytes of stdout/stderr kept per stream (tail is kept)
    pub max_output_bytes: usize,

    /// Whether steps inherit the runner's own environment.
    /// `PATH` is always passed through.
    pub inherit_env: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 64 * 1024,
            inherit_env: true,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn with_inherit_env(mut self, inherit_env: bool) -> Self {
        self.inherit_env = inherit_env;
        self
    }
}
