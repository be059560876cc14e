//! Minimal client for local and hosted text-generation servers.
//!
//! This crate provides a focused, non-streaming client for the handful of
//! completion dialects the game speaks:
//! - a generic local JSON endpoint (`{prompt, system, ...}` in,
//!   `{response|text|data}` out)
//! - KoboldCpp's `/api/v1/generate`
//! - OpenRouter chat completions
//! - HuggingFace Inference API
//!
//! The caller decides what to do on failure; this crate only reports it.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_KOBOLD_ENDPOINT: &str = "http://localhost:5001/api/v1/generate";
const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_OPENROUTER_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";
const DEFAULT_HUGGINGFACE_MODEL: &str = "google/gemma-2b-it";
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur when talking to a generation backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("backend disabled or endpoint not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("backend returned an empty completion")]
    Empty,
}

/// Which completion dialect to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Generic,
    #[serde(rename = "koboldcpp")]
    KoboldCpp,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

/// Backend connection settings, normally deserialized from `ai/settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Whether remote generation is enabled at all.
    pub enabled: bool,
    pub provider: Provider,
    /// Endpoint URL; providers with well-known defaults may leave it empty.
    pub endpoint: String,
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key, if any.
    /// The key itself never appears in config files.
    pub api_key_env: String,
    pub extra_headers: HashMap<String, String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: Provider::Generic,
            endpoint: String::new(),
            model: String::new(),
            timeout_secs: 8,
            api_key_env: String::new(),
            extra_headers: HashMap::new(),
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System/persona text for chat-style providers.
    pub system: String,
    /// The user prompt.
    pub prompt: String,
    /// Free-form context fields, folded into the payload for the
    /// generic provider.
    pub context: HashMap<String, String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerateRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            context: HashMap::new(),
            temperature: 0.2,
            max_tokens: 120,
        }
    }

    pub fn with_context(mut self, context: HashMap<String, String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text-generation client.
#[derive(Clone)]
pub struct LocalAi {
    client: reqwest::Client,
    settings: BackendSettings,
}

impl LocalAi {
    /// Build a client from backend settings.
    pub fn new(settings: BackendSettings) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Whether this client will attempt remote calls at all.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Issue one completion call and return the generated text.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String, Error> {
        if !self.settings.enabled {
            return Err(Error::NotConfigured);
        }

        let (endpoint, payload) = match self.settings.provider {
            Provider::Generic => {
                if self.settings.endpoint.is_empty() {
                    return Err(Error::NotConfigured);
                }
                (self.settings.endpoint.clone(), generic_payload(&self.settings, request))
            }
            Provider::KoboldCpp => (
                self.endpoint_or(DEFAULT_KOBOLD_ENDPOINT),
                kobold_payload(request),
            ),
            Provider::OpenRouter => (
                self.endpoint_or(DEFAULT_OPENROUTER_ENDPOINT),
                openrouter_payload(&self.settings, request),
            ),
            Provider::HuggingFace => {
                let model = if self.settings.model.is_empty() {
                    DEFAULT_HUGGINGFACE_MODEL
                } else {
                    &self.settings.model
                };
                let endpoint = if self.settings.endpoint.is_empty() {
                    format!("https://api-inference.huggingface.co/models/{model}")
                } else {
                    self.settings.endpoint.clone()
                };
                (endpoint, huggingface_payload(request))
            }
        };

        let response = self
            .client
            .post(&endpoint)
            .headers(self.build_headers()?)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        let text = extract_text(self.settings.provider, &body).ok_or(Error::Empty)?;
        if text.trim().is_empty() {
            return Err(Error::Empty);
        }
        Ok(text)
    }

    fn endpoint_or(&self, default: &str) -> String {
        if self.settings.endpoint.is_empty() {
            default.to_string()
        } else {
            self.settings.endpoint.clone()
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &self.settings.extra_headers {
            let name: reqwest::header::HeaderName = name
                .parse()
                .map_err(|_| Error::Config(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("invalid header value for {name:?}")))?;
            headers.insert(name, value);
        }
        if !self.settings.api_key_env.is_empty() {
            if let Ok(key) = std::env::var(&self.settings.api_key_env) {
                if !key.is_empty() && !headers.contains_key("authorization") {
                    let value = HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|e| Error::Config(format!("invalid API key: {e}")))?;
                    headers.insert("authorization", value);
                }
            }
        }
        Ok(headers)
    }
}

// ============================================================================
// Payload construction and response extraction, per provider
// ============================================================================

fn generic_payload(settings: &BackendSettings, request: &GenerateRequest) -> Value {
    json!({
        "model": settings.model,
        "prompt": request.prompt,
        "system": request.system,
        "context": request.context,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    })
}

fn kobold_payload(request: &GenerateRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "max_length": request.max_tokens,
        "temperature": request.temperature,
    })
}

fn openrouter_payload(settings: &BackendSettings, request: &GenerateRequest) -> Value {
    let model = if settings.model.is_empty() {
        DEFAULT_OPENROUTER_MODEL
    } else {
        &settings.model
    };
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": request.prompt },
        ],
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    })
}

fn huggingface_payload(request: &GenerateRequest) -> Value {
    json!({
        "inputs": request.prompt,
        "parameters": {
            "temperature": request.temperature.max(0.01),
            "max_new_tokens": request.max_tokens,
            "return_full_text": false,
        },
    })
}

/// Pull the generated text out of a provider response body.
fn extract_text(provider: Provider, body: &Value) -> Option<String> {
    match provider {
        Provider::Generic => ["response", "text", "data"]
            .iter()
            .find_map(|key| body.get(*key))
            .and_then(Value::as_str)
            .map(str::to_string),
        Provider::KoboldCpp => body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|first| first.get("text"))
            .or_else(|| body.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Provider::OpenRouter => body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string),
        Provider::HuggingFace => {
            if let Some(list) = body.as_array() {
                return list
                    .first()
                    .and_then(|entry| entry.get("generated_text"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
            }
            ["generated_text", "text", "answer"]
                .iter()
                .find_map(|key| body.get(*key))
                .and_then(Value::as_str)
                .map(str::to_string)
        }
    }
}
