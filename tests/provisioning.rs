use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use tokio::sync::mpsc;

use cloudshell_client::cloudshell::{
    ProvisionRequest, RetryPolicy, ShellKind, TerminalSize, provision_cloud_shell,
};
use cloudshell_client::config::Config;
use cloudshell_client::error::Error;
use cloudshell_client::rest::MockRestClient;

const CONSOLE_OK: &str = r#"{"properties": {"osType": "linux", "provisioningState": "Succeeded", "uri": "https://ccon-prod-westus.cloudshell.example.net/c1"}}"#;
const NO_LISTENERS: &str = "There are no listeners connected for the endpoint. TrackingId:1234";
const TERMINAL_OK: &str = r#"{"id": "term-42", "socketUri": "wss://ccon-prod-westus.cloudshell.example.net/c1/terminals/term-42"}"#;

fn request() -> ProvisionRequest {
    ProvisionRequest::from_config(&Config::default(), ShellKind::Bash, TerminalSize::new(30, 80))
}

#[tokio::test(start_paused = true)]
async fn provisions_after_console_warms_up() {
    let client = MockRestClient::new();
    client
        .respond(200, CONSOLE_OK)
        .respond(404, NO_LISTENERS)
        .respond(404, NO_LISTENERS)
        .respond(200, TERMINAL_OK);

    let (_resize_tx, resize_rx) = mpsc::channel(4);
    let shell = provision_cloud_shell(Arc::new(client.clone()), "tok", &request(), resize_rx)
        .await
        .unwrap();

    assert_eq!(
        shell.socket_url,
        "wss://ccon-prod-westus.cloudshell.example.net/c1/terminals/term-42"
    );
    assert_eq!(shell.token, "tok");
    assert_eq!(shell.terminal.id, "term-42");
    assert!(shell.socket_url.starts_with("wss://"));
    assert!(shell.socket_url.ends_with("/terminals/term-42"));

    let calls = client.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].method, Method::PUT);
    assert!(
        calls[0]
            .url
            .ends_with("/providers/Microsoft.Portal/consoles/default?api-version=2023-02-01-preview")
    );
    for call in &calls[1..] {
        assert_eq!(call.method, Method::POST);
        assert_eq!(
            call.url,
            "https://ccon-prod-westus.cloudshell.example.net/c1/terminals?cols=80&rows=30&shell=bash"
        );
    }
    assert_eq!(calls[2].at - calls[1].at, Duration::from_secs(3));
    assert_eq!(calls[3].at - calls[2].at, Duration::from_secs(3));

    shell.notifier.abort();
}

#[tokio::test]
async fn relay_fronted_console_gets_hub_address() {
    let client = MockRestClient::new();
    client
        .respond(
            200,
            r#"{"properties": {"uri": "https://h.servicebus.windows.net:443/cc-AAAA-AAAAAAAA"}}"#,
        )
        .respond(200, r#"{"id": "sess1", "socketUri": "wss://unused"}"#);

    let (_resize_tx, resize_rx) = mpsc::channel(4);
    let shell = provision_cloud_shell(Arc::new(client), "tok", &request(), resize_rx)
        .await
        .unwrap();

    assert_eq!(
        shell.socket_url,
        "wss://h.servicebus.windows.net:443/$hc/cc-AAAA-AAAAAAAA/terminals/sess1"
    );
    assert_eq!(
        shell.terminal.console_url,
        "https://h.servicebus.windows.net:443/cc-AAAA-AAAAAAAA"
    );
    shell.notifier.abort();
}

#[tokio::test]
async fn malformed_console_response_never_creates_a_terminal() {
    for body in [r#"{"name": "default"}"#, r#"{"properties": {"osType": "linux"}}"#] {
        let client = MockRestClient::new();
        client.respond(200, body).respond(200, TERMINAL_OK);

        let (_resize_tx, resize_rx) = mpsc::channel(4);
        let err = provision_cloud_shell(Arc::new(client.clone()), "tok", &request(), resize_rx)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)), "{body}: {err}");
        assert_eq!(client.calls().len(), 1);
        assert_eq!(client.remaining(), 1);
    }
}

#[tokio::test]
async fn console_failure_aborts_provisioning() {
    let client = MockRestClient::new();
    client.respond(403, r#"{"error": "Forbidden"}"#);

    let (_resize_tx, resize_rx) = mpsc::channel(4);
    let err = provision_cloud_shell(Arc::new(client.clone()), "tok", &request(), resize_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConsoleCreation(_)));
    assert_eq!(err.rest_error().and_then(|e| e.status()), Some(403));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_not_ready() {
    let client = MockRestClient::new();
    client.respond(200, CONSOLE_OK);
    for _ in 0..3 {
        client.respond(404, r#"{"error": {"code": "EndpointNotFound"}}"#);
    }

    let mut request = request();
    request.retry = RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_secs(1),
    };

    let (_resize_tx, resize_rx) = mpsc::channel(4);
    let err = provision_cloud_shell(Arc::new(client.clone()), "tok", &request, resize_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotReady { attempts: 3, .. }));
    assert!(err.rest_error().is_some_and(|e| e.is_not_ready()));
    assert_eq!(client.calls().len(), 4);
}

#[tokio::test]
async fn resize_events_reach_the_terminal_and_failures_are_swallowed() {
    let client = MockRestClient::new();
    client
        .respond(200, CONSOLE_OK)
        .respond(200, TERMINAL_OK)
        .respond(500, "resize exploded")
        .respond(200, "");

    let (resize_tx, resize_rx) = mpsc::channel(4);
    let shell = provision_cloud_shell(Arc::new(client.clone()), "tok", &request(), resize_rx)
        .await
        .unwrap();

    resize_tx.send(TerminalSize::new(24, 100)).await.unwrap();
    resize_tx.send(TerminalSize::new(48, 160)).await.unwrap();
    drop(resize_tx);
    shell.notifier.await.unwrap();

    let urls: Vec<String> = client.calls().into_iter().skip(2).map(|c| c.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://ccon-prod-westus.cloudshell.example.net/c1/terminals/term-42/size?cols=100&rows=24",
            "https://ccon-prod-westus.cloudshell.example.net/c1/terminals/term-42/size?cols=160&rows=48",
        ]
    );
}
