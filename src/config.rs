use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cloudshell::{RetryPolicy, ShellKind};
use crate::error::{Error, Result};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cloudshell.toml";

/// Cloud management API configuration
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CloudConfig {
    /// Resource manager endpoint the console is created under
    pub management_url: String,
    /// API version of the console provider
    pub api_version: String,
    /// Referer header sent with every request
    pub referer: String,
    /// Region the console should be placed in
    pub preferred_location: String,
    /// Operating system requested for the console
    pub os_type: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            management_url: "https://management.azure.com".to_string(),
            api_version: "2023-02-01-preview".to_string(),
            referer: "https://portal.azure.com/".to_string(),
            preferred_location: "westus".to_string(),
            os_type: "linux".to_string(),
        }
    }
}

/// Terminal provisioning configuration
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell launched when none is given on the command line
    pub shell: ShellKind,
    /// Attempts at creating the terminal while the console starts up
    pub max_attempts: u32,
    /// Fixed delay between attempts, in seconds
    pub retry_delay_secs: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: ShellKind::Bash,
            max_attempts: 5,
            retry_delay_secs: 3,
        }
    }
}

/// Logging configuration
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of standard error
    pub file: Option<String>,
}

/// Main configuration structure
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub cloud: CloudConfig,
    pub terminal: TerminalConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use default values
    pub fn load(config_path: Option<String>) -> Result<Self> {
        match config_path {
            Some(path) => Self::from_file(&path),
            None => {
                // Try to load from default location, otherwise use defaults
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    Self::from_file(DEFAULT_CONFIG_FILE)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self> {
        tracing::info!("Loading configuration from file: {}", path);

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_string()),
            _ => Error::Io(e),
        })?;

        let config = Self::parse(&content)?;
        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// URL of the "create console" call
    pub fn console_create_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.Portal/consoles/default?api-version={}",
            self.cloud.management_url.trim_end_matches('/'),
            self.cloud.api_version
        )
    }

    /// Retry policy for terminal creation
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.terminal.max_attempts.max(1),
            delay: Duration::from_secs(self.terminal.retry_delay_secs),
        }
    }
}
