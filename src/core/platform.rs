//! Target platforms and the shells used to run commands on them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating-system family a job targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl OsFamily {
    /// Family of the machine this process runs on
    pub fn host() -> Self {
        match std::env::consts::OS {
            "linux" => OsFamily::Linux,
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            _ => OsFamily::Other,
        }
    }
}

/// A job's target platform, identified by its OS label (e.g. `ubuntu-latest`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub label: String,
    pub family: OsFamily,
}

impl Platform {
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        let family = if lower.starts_with("windows") || lower.starts_with("win-") {
            OsFamily::Windows
        } else if lower.starts_with("macos") || lower.starts_with("osx") {
            OsFamily::MacOs
        } else if ["ubuntu", "linux", "debian", "fedora", "alpine"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            OsFamily::Linux
        } else {
            OsFamily::Other
        };

        Self {
            label: label.trim().to_string(),
            family,
        }
    }

    /// Shell used for `run` steps without an explicit override
    pub fn default_shell(&self) -> Shell {
        match self.family {
            OsFamily::Windows => Shell::Pwsh,
            _ => Shell::Bash,
        }
    }

    /// Whether this platform can be served by the current host
    pub fn matches_host(&self) -> bool {
        self.family != OsFamily::Other && self.family == OsFamily::host()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Shell that executes a `run` step's command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Bash,
    Sh,
    Pwsh,
    Cmd,
}

impl Shell {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Sh => "sh",
            Shell::Pwsh => "pwsh",
            Shell::Cmd => "cmd",
        }
    }

    /// Program and arguments that run `command` in this shell
    pub fn invocation(&self, command: &str) -> (&'static str, Vec<String>) {
        let args: Vec<&str> = match self {
            Shell::Bash => vec!["--noprofile", "--norc", "-eo", "pipefail", "-c"],
            Shell::Sh => vec!["-e", "-c"],
            Shell::Pwsh => vec!["-NoProfile", "-NonInteractive", "-Command"],
            Shell::Cmd => vec!["/D", "/S", "/C"],
        };

        let mut args: Vec<String> = args.into_iter().map(String::from).collect();
        args.push(command.to_string());
        (self.as_str(), args)
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bash" => Ok(Shell::Bash),
            "sh" => Ok(Shell::Sh),
            "pwsh" | "powershell" => Ok(Shell::Pwsh),
            "cmd" => Ok(Shell::Cmd),
            other => Err(format!("Unknown shell: {}", other)),
        }
    }
}
