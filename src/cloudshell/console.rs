/// Console creation
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use crate::cloudshell::Console;
use crate::error::{Error, Result};
use crate::rest::{JsonObject, RestClient};
use crate::terminal::display_message;

/// Request a console from the management API.
///
/// One attempt only: any failure ends provisioning.
pub async fn create_console(
    client: &dyn RestClient,
    token: &str,
    create_url: &str,
    os_type: &str,
) -> Result<Console> {
    display_message("Requesting a Cloud Shell.");

    let payload = json!({ "properties": { "osType": os_type } }).to_string();
    let result = client
        .send(token, Method::PUT, create_url, &payload)
        .await
        .map_err(Error::ConsoleCreation)?;
    debug!("Console response: {:?}", result);

    let url = console_uri(&result)?;
    info!("Console ready at {}", url);
    Ok(Console { url })
}

/// Extract `properties.uri` from a console response
fn console_uri(result: &JsonObject) -> Result<String> {
    let properties = result
        .get("properties")
        .and_then(|p| p.as_object())
        .ok_or_else(|| {
            Error::InvalidResponse("missing or invalid 'properties' field".to_string())
        })?;

    match properties.get("uri").and_then(|u| u.as_str()) {
        Some(uri) if !uri.is_empty() => Ok(uri.to_string()),
        _ => Err(Error::InvalidResponse(
            "missing or invalid 'uri' field".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{MockRestClient, RestError};

    const CREATE_URL: &str = "https://management.example.com/providers/Microsoft.Portal/consoles/default?api-version=1";

    #[tokio::test]
    async fn returns_the_console_uri() {
        let client = MockRestClient::new();
        client.respond(
            200,
            r#"{"properties": {"osType": "linux", "provisioningState": "Succeeded", "uri": "https://console.example.com/c1"}}"#,
        );

        let console = create_console(&client, "tok", CREATE_URL, "linux").await.unwrap();
        assert_eq!(console.url, "https://console.example.com/c1");

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::PUT);
        assert_eq!(calls[0].url, CREATE_URL);
        assert_eq!(calls[0].token, "tok");
        let payload: serde_json::Value = serde_json::from_str(&calls[0].payload).unwrap();
        assert_eq!(payload, json!({ "properties": { "osType": "linux" } }));
    }

    #[tokio::test]
    async fn missing_fields_are_invalid_responses() {
        let bodies = [
            r#"{}"#,
            r#"{"properties": "linux"}"#,
            r#"{"properties": {}}"#,
            r#"{"properties": {"uri": ""}}"#,
            r#"{"properties": {"uri": 42}}"#,
        ];
        for body in bodies {
            let client = MockRestClient::new();
            client.respond(200, body);
            let err = create_console(&client, "tok", CREATE_URL, "linux")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidResponse(_)), "{body}: {err}");
        }
    }

    #[tokio::test]
    async fn failures_are_not_retried() {
        let client = MockRestClient::new();
        client.respond(401, "unauthorized").respond(200, "{}");

        let err = create_console(&client, "tok", CREATE_URL, "linux")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConsoleCreation(RestError::Status { status: 401, .. })
        ));
        assert_eq!(client.calls().len(), 1);
        assert_eq!(client.remaining(), 1);
    }
}
