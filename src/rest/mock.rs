/// Mock REST client for testing purposes
/// Replays scripted responses in order and records every request it receives
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use reqwest::Method;
use tokio::time::Instant;
use tracing::debug;

use crate::rest::{JsonObject, RestClient, RestError, RestResult, decode_response};

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub token: String,
    pub method: Method,
    pub url: String,
    pub payload: String,
    pub at: Instant,
}

/// Mock REST client that answers from a script
#[derive(Debug, Clone, Default)]
pub struct MockRestClient {
    responses: Arc<Mutex<VecDeque<RestResult<JsonObject>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockRestClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw HTTP answer; it is classified like a real response
    pub fn respond(&self, status: u16, body: &str) -> &Self {
        self.push(decode_response(status, body))
    }

    /// Queue a transport failure
    pub fn fail_transport(&self, message: &str) -> &Self {
        self.push(Err(RestError::Transport(message.to_string())))
    }

    fn push(&self, response: RestResult<JsonObject>) -> &Self {
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .push_back(response);
        self
    }

    /// All requests received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    /// Number of scripted responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .len()
    }
}

#[async_trait::async_trait]
impl RestClient for MockRestClient {
    async fn send(
        &self,
        token: &str,
        method: Method,
        url: &str,
        payload: &str,
    ) -> RestResult<JsonObject> {
        debug!("Mock REST {} {}", method, url);
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(RecordedCall {
                token: token.to_string(),
                method,
                url: url.to_string(),
                payload: payload.to_string(),
                at: Instant::now(),
            });

        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(RestError::Transport("no scripted response left".to_string())))
    }
}
