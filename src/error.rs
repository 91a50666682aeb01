use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use toml::de::Error as TomlDeError;

use crate::rest::RestError;

/// Result type alias with our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error type for the cloud shell client
#[derive(Error, Debug)]
pub enum Error {
    /// The console could not be created
    #[error("failed to create console: {0}")]
    ConsoleCreation(#[source] RestError),

    /// The terminal could not be created inside the console
    #[error("failed to create terminal: {0}")]
    TerminalCreation(#[source] RestError),

    /// The console kept reporting that it was still starting
    #[error("failed to create terminal after {attempts} attempts: {source}")]
    NotReady {
        attempts: u32,
        #[source]
        source: RestError,
    },

    /// A provisioning response was missing a required field
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// WebSocket handshake with the relay failed
    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] TungsteniteError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error
    #[error("Config error: {0}")]
    Config(#[from] TomlDeError),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Invalid URL error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The bearer token could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Tracing/logging error
    #[error("Logging error: {0}")]
    Logging(String),
}

impl Error {
    /// The REST failure behind a provisioning error, if there is one
    pub fn rest_error(&self) -> Option<&RestError> {
        match self {
            Error::ConsoleCreation(e) | Error::TerminalCreation(e) => Some(e),
            Error::NotReady { source, .. } => Some(source),
            _ => None,
        }
    }
}
