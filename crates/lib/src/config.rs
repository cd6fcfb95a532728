//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.stylesense/config.json`) and environment.
//! Holds the flow service address, the default tweak map and which flow components
//! receive the style inputs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::tweaks::Tweaks;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote flow service settings.
    #[serde(default)]
    pub flow: FlowConfig,

    /// Which flow components receive the sidebar style inputs.
    #[serde(default)]
    pub style: StyleConfig,
}

/// Flow service address, endpoint and request defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    /// Base URL of the flow service (default "http://127.0.0.1:7860").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint name or flow id to run (default "fashion").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_io_type")]
    pub output_type: String,

    #[serde(default = "default_io_type")]
    pub input_type: String,

    /// Sent as `x-api-key`. Overridden by STYLESENSE_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base tweak map sent with every request. Keys are component ids owned by the flow.
    #[serde(default = "default_tweaks")]
    pub tweaks: Tweaks,
}

/// Component ids that receive the body shape and skin tone inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default = "default_body_shape_component")]
    pub body_shape_component: String,

    #[serde(default = "default_skin_tone_component")]
    pub skin_tone_component: String,
}

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7860";
pub const DEFAULT_ENDPOINT: &str = "fashion";

/// Components of the fashion flow, each with an empty override object.
const DEFAULT_COMPONENTS: [&str; 8] = [
    "ChatInput-1HPhr",
    "OpenAIModel-yAmO2",
    "Prompt-dHJOb",
    "ChatOutput-l41MR",
    "Memory-J95HC",
    "TextInput-GBnao",
    "Prompt-SdNnw",
    "TextInput-KwRKr",
];

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_io_type() -> String {
    "chat".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_tweaks() -> Tweaks {
    let mut tweaks = Tweaks::new();
    for component in DEFAULT_COMPONENTS {
        tweaks.insert_component(component, serde_json::Map::new());
    }
    tweaks
}

fn default_body_shape_component() -> String {
    "TextInput-GBnao".to_string()
}

fn default_skin_tone_component() -> String {
    "TextInput-KwRKr".to_string()
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            output_type: default_io_type(),
            input_type: default_io_type(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            tweaks: default_tweaks(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            body_shape_component: default_body_shape_component(),
            skin_tone_component: default_skin_tone_component(),
        }
    }
}

impl FlowConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolve the flow API key: env STYLESENSE_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("STYLESENSE_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| configured_api_key(config))
}

/// The `flow.apiKey` from the config file, trimmed; blank counts as unset.
fn configured_api_key(config: &Config) -> Option<String> {
    config
        .flow
        .api_key
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("STYLESENSE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".stylesense").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or STYLESENSE_CONFIG_PATH).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
