/// Terminal creation and relay address normalization
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::cloudshell::{Console, RetryPolicy, ShellKind, Terminal, TerminalSize};
use crate::error::{Error, Result};
use crate::rest::{JsonObject, RestClient};
use crate::terminal::display_message;

/// Marker identifying consoles fronted by a message relay
const RELAY_HOST_MARKER: &str = "servicebus";

/// Create a terminal inside `console`, retrying while the console is still starting.
///
/// Only "not ready" answers (404 with a listener marker) are retried, with a
/// fixed delay between attempts. Anything else is returned at once.
pub async fn create_terminal(
    client: &dyn RestClient,
    token: &str,
    console: &Console,
    shell: ShellKind,
    size: TerminalSize,
    policy: RetryPolicy,
) -> Result<Terminal> {
    display_message("Connecting terminal...");

    let url = format!(
        "{}/terminals?cols={}&rows={}&shell={}",
        console.url, size.cols, size.rows, shell
    );
    let payload = json!({ "tokens": [] }).to_string();

    let mut attempt = 1;
    let result = loop {
        match client.send(token, Method::POST, &url, &payload).await {
            Ok(result) => break result,
            Err(e) if e.is_not_ready() && attempt < policy.max_attempts => {
                info!(
                    "Terminal endpoint not ready (attempt {}/{}): {}",
                    attempt, policy.max_attempts, e
                );
                display_message(&format!(
                    "Cloud Shell container is starting... (attempt {}/{}, waiting {:?})",
                    attempt, policy.max_attempts, policy.delay
                ));
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) if e.is_not_ready() => {
                return Err(Error::NotReady {
                    attempts: attempt,
                    source: e,
                });
            }
            Err(e) => return Err(Error::TerminalCreation(e)),
        }
    };
    debug!("Terminal response: {:?}", result);

    let id = required_str(&result, "id")?;
    let socket_uri = required_str(&result, "socketUri")?;
    debug!("Terminal {} advertised socket {}", id, socket_uri);

    let socket_url = normalize_socket_url(&console.url, &id);
    info!("Terminal {} created after {} attempt(s), relay at {}", id, attempt, socket_url);

    Ok(Terminal {
        id,
        socket_url,
        console_url: console.url.clone(),
    })
}

fn required_str(result: &JsonObject, field: &str) -> Result<String> {
    match result.get(field).and_then(|v| v.as_str()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(Error::InvalidResponse(format!(
            "missing or invalid '{}' field",
            field
        ))),
    }
}

/// Derive the websocket address of terminal `id` from its console URL.
///
/// Direct consoles: `https://host/path` becomes `wss://host/path/terminals/<id>`.
/// Relay-fronted consoles get `/$hc` inserted before the path:
/// `https://h.servicebus.windows.net:443/cc-1` becomes
/// `wss://h.servicebus.windows.net:443/$hc/cc-1/terminals/<id>`.
pub fn normalize_socket_url(console_url: &str, id: &str) -> String {
    if !console_url.contains(RELAY_HOST_MARKER) {
        let without_scheme = console_url.strip_prefix("https").unwrap_or(console_url);
        return format!("wss{}/terminals/{}", without_scheme, id);
    }

    let ws_url = console_url.replacen("https://", "wss://", 1);
    let scheme_len = "wss://".len();
    let path_start = ws_url
        .get(scheme_len..)
        .and_then(|rest| rest.find('/'))
        .map(|offset| offset + scheme_len);

    match path_start {
        Some(i) => format!("{}/$hc{}/terminals/{}", &ws_url[..i], &ws_url[i..], id),
        None => format!("{}/$hc/terminals/{}", ws_url, id),
    }
}
