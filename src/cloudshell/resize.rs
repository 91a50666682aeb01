/// Background notifier forwarding local size changes to the remote terminal
use std::sync::Arc;

use reqwest::Method;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cloudshell::{Terminal, TerminalSize};
use crate::rest::{RestClient, RestError};

/// Tells the remote terminal about new local dimensions
#[derive(Debug, Clone)]
pub struct ResizeNotifier {
    client: Arc<dyn RestClient>,
    token: String,
    console_url: String,
    terminal_id: String,
}

impl ResizeNotifier {
    pub fn new(client: Arc<dyn RestClient>, token: &str, terminal: &Terminal) -> Self {
        Self {
            client,
            token: token.to_string(),
            console_url: terminal.console_url.clone(),
            terminal_id: terminal.id.clone(),
        }
    }

    fn size_url(&self, size: TerminalSize) -> String {
        format!(
            "{}/terminals/{}/size?cols={}&rows={}",
            self.console_url, self.terminal_id, size.cols, size.rows
        )
    }

    /// Send one resize notification. Failures are logged and dropped.
    pub async fn notify(&self, size: TerminalSize) {
        let url = self.size_url(size);
        match self.client.send(&self.token, Method::POST, &url, "").await {
            Ok(_) => debug!("Remote terminal {} resized to {}", self.terminal_id, size),
            // The size endpoint answers 2xx with an empty body
            Err(RestError::Parse(_)) => {
                debug!("Remote terminal {} resized to {} (no body)", self.terminal_id, size)
            }
            Err(e) => warn!("Failed to resize terminal {}: {}", self.terminal_id, e),
        }
    }

    /// Consume size events until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<TerminalSize>) {
        info!("Resize notifier started for terminal {}", self.terminal_id);
        while let Some(size) = events.recv().await {
            self.notify(size).await;
        }
        info!("Resize notifier for terminal {} stopped", self.terminal_id);
    }
}
