//! Flow HTTP client (http://127.0.0.1:7860 by default).
//! One POST per run, no retry. HTTP status is logged but never short-circuits decoding.

use async_trait::async_trait;
use reqwest::header::InvalidHeaderValue;
use serde_json::Value;
use std::time::Duration;

use super::request::RunRequest;
use crate::config::{FlowConfig, DEFAULT_BASE_URL};

/// Client for the flow run API.
#[derive(Clone)]
pub struct FlowClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Connection refused, DNS failure, timeout, or the body could not be read.
    #[error("flow request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered but the body is not JSON.
    #[error("flow response (status {status}) is not valid JSON: {source}")]
    Decode {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("api key is not a valid header value: {0}")]
    InvalidApiKey(#[from] InvalidHeaderValue),
}

/// Decoded response plus the status it arrived with.
#[derive(Debug, Clone)]
pub struct FlowResponse {
    pub status: u16,
    pub body: Value,
}

/// Anything that can run a flow request. Implemented by [`FlowClient`]; tests substitute fakes.
#[async_trait]
pub trait FlowRunner: Send + Sync {
    /// Run the request. Decode failures yield an empty object; transport failures are errors.
    async fn run(&self, request: &RunRequest) -> Result<Value, FlowError>;
}

impl FlowClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, FlowError> {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &FlowConfig) -> Result<Self, FlowError> {
        Self::new(Some(config.base_url.clone()), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /api/v1/run/{endpoint} and decode the body, keeping decode failures distinct.
    pub async fn send(&self, request: &RunRequest) -> Result<FlowResponse, FlowError> {
        let url = request.url(&self.base_url);
        let res = self
            .client
            .post(&url)
            .headers(request.headers()?)
            .json(&request.payload())
            .send()
            .await?;
        let status = res.status().as_u16();
        let text = res.text().await?;
        log::info!("flow response status code: {}", status);
        log::info!("flow response text: {}", text);
        match serde_json::from_str(&text) {
            Ok(body) => Ok(FlowResponse { status, body }),
            Err(source) => Err(FlowError::Decode {
                status,
                body: text,
                source,
            }),
        }
    }

    /// Like [`send`](Self::send), but a body that is not JSON becomes an empty object.
    pub async fn run(&self, request: &RunRequest) -> Result<Value, FlowError> {
        match self.send(request).await {
            Ok(res) => Ok(res.body),
            Err(FlowError::Decode { status, .. }) => {
                log::error!(
                    "failed to decode JSON from the flow response (status {})",
                    status
                );
                Ok(Value::Object(serde_json::Map::new()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl FlowRunner for FlowClient {
    async fn run(&self, request: &RunRequest) -> Result<Value, FlowError> {
        FlowClient::run(self, request).await
    }
}
