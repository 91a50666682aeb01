use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use cloudshell_client::cloudshell::{ProvisionRequest, ShellKind, provision_cloud_shell};
use cloudshell_client::config::Config;
use cloudshell_client::credential::acquire_token;
use cloudshell_client::error::Result;
use cloudshell_client::logger::init_logging;
use cloudshell_client::relay::{CrosstermMode, InterruptSource, ResizeSource, TerminalRelay};
use cloudshell_client::rest::{HttpRestClient, RestClient, RestHeaders};
use cloudshell_client::terminal::{display_error, terminal_size};

/// Launch a cloud shell from your terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shell to launch (defaults to the configured shell, then bash)
    #[arg(short, long, value_enum)]
    shell: Option<ShellKind>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Write logs to this file instead of standard error
    #[arg(long)]
    log_file: Option<String>,

    /// Access token for the management API (defaults to AZURE_ACCESS_TOKEN, then the Azure CLI)
    #[arg(long)]
    token: Option<String>,
}

/// Resize events buffered between the relay and the notifier
const RESIZE_BUFFER: usize = 16;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            display_error(&e.to_string());
            1
        }
    };
    // The blocking stdin reader would otherwise keep the runtime alive
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    let log_file = cli.log_file.or_else(|| config.logging.file.clone());
    let _log_guard = init_logging(cli.debug, log_file.as_deref())?;

    let shell = cli.shell.unwrap_or(config.terminal.shell);
    let token = acquire_token(cli.token).await?;

    let (resize_tx, resize_rx) = mpsc::channel(RESIZE_BUFFER);
    let initial_size = terminal_size();
    let request = ProvisionRequest::from_config(&config, shell, initial_size);

    let client: Arc<dyn RestClient> =
        Arc::new(HttpRestClient::new(RestHeaders::from(&config.cloud)));
    let provisioned = provision_cloud_shell(client, &token, &request, resize_rx).await?;

    let relay = TerminalRelay::new(
        CrosstermMode,
        InterruptSource::os()?,
        ResizeSource::os()?,
        resize_tx,
    );
    let report = relay.run(&provisioned.socket_url).await?;

    tracing::debug!("Session states: {:?}, ended by {:?}", report.states, report.end);
    // The console is not torn down here
    tracing::debug!(
        "Leaving console {} to the service",
        provisioned.terminal.console_url
    );
    provisioned.notifier.abort();
    Ok(())
}
