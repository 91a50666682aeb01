/// reqwest-backed implementation of the REST client
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, REFERER};
use reqwest::{Client, Method};
use tracing::debug;

use crate::config::CloudConfig;
use crate::rest::{JsonObject, RestClient, RestError, RestResult, decode_response};

/// Header naming the region the console should be placed in
pub const PREFERRED_LOCATION_HEADER: &str = "x-ms-console-preferred-location";

/// Fixed provider-specific headers sent with every request
#[derive(Debug, Clone)]
pub struct RestHeaders {
    pub referer: String,
    pub preferred_location: String,
}

impl From<&CloudConfig> for RestHeaders {
    fn from(config: &CloudConfig) -> Self {
        Self {
            referer: config.referer.clone(),
            preferred_location: config.preferred_location.clone(),
        }
    }
}

/// HTTP client for the console provisioning API
#[derive(Debug, Clone)]
pub struct HttpRestClient {
    client: Client,
    headers: RestHeaders,
}

impl HttpRestClient {
    pub fn new(headers: RestHeaders) -> Self {
        Self::with_client(Client::new(), headers)
    }

    /// Use a preconfigured reqwest client (proxy, timeouts, TLS settings)
    pub fn with_client(client: Client, headers: RestHeaders) -> Self {
        Self { client, headers }
    }
}

#[async_trait::async_trait]
impl RestClient for HttpRestClient {
    async fn send(
        &self,
        token: &str,
        method: Method,
        url: &str,
        payload: &str,
    ) -> RestResult<JsonObject> {
        debug!("{} {}", method, url);

        let response = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(REFERER, &self.headers.referer)
            .header(PREFERRED_LOCATION_HEADER, &self.headers.preferred_location)
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| RestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RestError::Transport(format!("failed to read response body: {}", e)))?;

        debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        decode_response(status, &body)
    }
}
