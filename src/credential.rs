/// Bearer token acquisition
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable holding a ready-made access token
pub const TOKEN_ENV_VAR: &str = "AZURE_ACCESS_TOKEN";

/// Resource the management API tokens are issued for
const TOKEN_RESOURCE: &str = "https://management.core.windows.net/";

/// Obtain the bearer token for the management API.
///
/// An explicit token wins, then `AZURE_ACCESS_TOKEN`, then the Azure CLI.
pub async fn acquire_token(explicit: Option<String>) -> Result<String> {
    if let Some(token) = explicit.and_then(non_empty) {
        debug!("Using access token from the command line");
        return Ok(token);
    }

    if let Some(token) = std::env::var(TOKEN_ENV_VAR).ok().and_then(non_empty) {
        debug!("Using access token from {}", TOKEN_ENV_VAR);
        return Ok(token);
    }

    info!("Requesting access token from the Azure CLI");
    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            TOKEN_RESOURCE,
            "--query",
            "accessToken",
            "-o",
            "tsv",
        ])
        .output()
        .await
        .map_err(|e| Error::Credential(format!("failed to run the Azure CLI: {}", e)))?;

    if !output.status.success() {
        return Err(Error::Credential(format!(
            "the Azure CLI exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    non_empty(String::from_utf8_lossy(&output.stdout).into_owned())
        .ok_or_else(|| Error::Credential("the Azure CLI returned an empty token".to_string()))
}

fn non_empty(token: String) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
