//! Run request: URL, JSON body and headers for one flow invocation.

use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::Serialize;

use crate::tweaks::Tweaks;

/// Header carrying the optional static API key.
pub const API_KEY_HEADER: &str = "x-api-key";

const RUN_PATH: &str = "/api/v1/run/";

/// One flow invocation. Built fresh per turn and dropped after the call.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub message: String,
    /// Endpoint name or flow id.
    pub endpoint: String,
    pub output_type: String,
    pub input_type: String,
    pub tweaks: Option<Tweaks>,
    pub api_key: Option<String>,
}

/// Wire body of `POST /api/v1/run/{endpoint}`.
#[derive(Debug, Serialize)]
pub struct RunPayload<'a> {
    pub input_value: &'a str,
    pub output_type: &'a str,
    pub input_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweaks: Option<&'a Tweaks>,
}

impl RunRequest {
    /// Request with "chat" output and input types, no tweaks and no key.
    pub fn new(message: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            endpoint: endpoint.into(),
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            tweaks: None,
            api_key: None,
        }
    }

    pub fn with_types(mut self, output_type: impl Into<String>, input_type: impl Into<String>) -> Self {
        self.output_type = output_type.into();
        self.input_type = input_type.into();
        self
    }

    pub fn with_tweaks(mut self, tweaks: Tweaks) -> Self {
        self.tweaks = Some(tweaks);
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// `{base_url}/api/v1/run/{endpoint}`; a trailing slash on `base_url` is dropped.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}{}", base_url.trim_end_matches('/'), RUN_PATH, self.endpoint)
    }

    /// JSON body. Empty tweaks are omitted entirely.
    pub fn payload(&self) -> RunPayload<'_> {
        RunPayload {
            input_value: &self.message,
            output_type: &self.output_type,
            input_type: &self.input_type,
            tweaks: self.tweaks.as_ref().filter(|t| !t.is_empty()),
        }
    }

    /// `x-api-key` carrying the key unchanged when it is non-blank; otherwise no headers.
    pub fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }
}
