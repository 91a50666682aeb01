/// REST client trait shared by the real HTTP client and the scripted mock
use std::fmt::Debug;

use reqwest::Method;
use serde_json::{Map, Value};
use thiserror::Error;

/// A decoded JSON response body
pub type JsonObject = Map<String, Value>;

/// REST error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// The request never produced a response (DNS, connect, TLS, body read)
    #[error("failed to execute request: {0}")]
    Transport(String),

    /// The server answered outside the 2xx range
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a JSON object
    #[error("failed to parse JSON response: {0}")]
    Parse(String),
}

impl RestError {
    /// Whether the console answered that its terminal endpoint is not listening yet.
    ///
    /// A freshly started console returns 404 with either `EndpointNotFound` or
    /// `no listeners` in the body until its container is up.
    pub fn is_not_ready(&self) -> bool {
        match self {
            RestError::Status { status: 404, body } => {
                body.contains("EndpointNotFound") || body.contains("no listeners")
            }
            _ => false,
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// REST result type
pub type RestResult<T> = Result<T, RestError>;

/// Authenticated JSON REST client.
///
/// Implementations send one request per call and never retry; retry policy
/// belongs to the caller.
#[async_trait::async_trait]
pub trait RestClient: Send + Sync + Debug {
    async fn send(
        &self,
        token: &str,
        method: Method,
        url: &str,
        payload: &str,
    ) -> RestResult<JsonObject>;
}

/// Classify a finished response: non-2xx is a status failure, otherwise the
/// body must be a JSON object.
pub fn decode_response(status: u16, body: &str) -> RestResult<JsonObject> {
    if !(200..300).contains(&status) {
        return Err(RestError::Status {
            status,
            body: body.to_string(),
        });
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(RestError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(RestError::Parse(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
