/// Data types shared by the provisioning steps and the relay
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Terminal geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl TerminalSize {
    /// Size assumed when the local terminal cannot be queried
    pub const FALLBACK: TerminalSize = TerminalSize { rows: 30, cols: 80 };

    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl fmt::Display for TerminalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// Shell launched inside the remote terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    #[default]
    Bash,
    Pwsh,
}

impl ShellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::Pwsh => "pwsh",
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned console, known only by its base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Console {
    pub url: String,
}

/// A terminal running inside a console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    /// Opaque id, used to address resize calls
    pub id: String,
    /// Normalized websocket address of the relay
    pub socket_url: String,
    /// Base URL of the console the terminal belongs to
    pub console_url: String,
}

/// Fixed-delay retry policy for terminal creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(3),
        }
    }
}
