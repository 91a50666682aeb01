/// Console → terminal provisioning sequence
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cloudshell::{
    ResizeNotifier, RetryPolicy, ShellKind, Terminal, TerminalSize, create_console,
    create_terminal,
};
use crate::config::Config;
use crate::error::Result;
use crate::rest::RestClient;

/// Where and how to provision
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// URL of the "create console" call
    pub create_url: String,
    pub os_type: String,
    pub shell: ShellKind,
    pub initial_size: TerminalSize,
    pub retry: RetryPolicy,
}

impl ProvisionRequest {
    pub fn from_config(config: &Config, shell: ShellKind, initial_size: TerminalSize) -> Self {
        Self {
            create_url: config.console_create_url(),
            os_type: config.cloud.os_type.clone(),
            shell,
            initial_size,
            retry: config.retry_policy(),
        }
    }
}

/// A ready cloud shell
#[derive(Debug)]
pub struct ProvisionedShell {
    /// Websocket address the relay connects to
    pub socket_url: String,
    /// Bearer token the shell was provisioned with
    pub token: String,
    pub terminal: Terminal,
    /// Background resize notifier; ends once every resize sender is dropped
    pub notifier: JoinHandle<()>,
}

/// Create a console, create a terminal in it, then start the resize notifier.
///
/// The notifier only starts once the terminal id is known, so no resize event
/// can be addressed to a terminal that does not exist yet.
pub async fn provision_cloud_shell(
    client: Arc<dyn RestClient>,
    token: &str,
    request: &ProvisionRequest,
    resize_events: mpsc::Receiver<TerminalSize>,
) -> Result<ProvisionedShell> {
    let console = create_console(
        client.as_ref(),
        token,
        &request.create_url,
        &request.os_type,
    )
    .await?;

    let terminal = create_terminal(
        client.as_ref(),
        token,
        &console,
        request.shell,
        request.initial_size,
        request.retry,
    )
    .await?;

    let notifier = ResizeNotifier::new(client, token, &terminal);
    let notifier = tokio::spawn(notifier.run(resize_events));
    info!("Cloud shell provisioned: terminal {} on {}", terminal.id, terminal.console_url);

    Ok(ProvisionedShell {
        socket_url: terminal.socket_url.clone(),
        token: token.to_string(),
        terminal,
        notifier,
    })
}
