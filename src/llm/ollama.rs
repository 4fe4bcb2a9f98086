//! Ollama-compatible client for the text-generation backend.
//!
//! The backend is asked for a buffered (non-streaming) completion. Some
//! deployments still answer with newline-delimited JSON fragments, so the
//! response decoder accepts both a single JSON document and a fragment
//! sequence in which the last parseable line wins.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::LlmError;

/// Default backend address for a local Ollama daemon.
pub const DEFAULT_API_BASE: &str = "http://localhost:11434";

/// Default model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "mistral";

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

/// Request for text generation from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model identifier. Empty means the client's default model.
    pub model: String,
    /// Fully formatted prompt.
    pub prompt: String,
    /// Sampling parameters.
    pub sampling: SamplingParams,
    /// Whether the backend may stream. Always `false` for this client.
    pub stream: bool,
}

impl GenerationRequest {
    /// Create a new buffered generation request with default sampling.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            sampling: SamplingParams::default(),
            stream: false,
        }
    }

    /// Set the sampling parameters for this request.
    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Response from a generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    /// Generated text, trimmed. Empty when the backend omitted the field.
    pub text: String,
}

/// Trait for backends that can generate text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Client for Ollama-compatible `/api/generate` endpoints.
pub struct OllamaClient {
    /// Base URL for the API.
    api_base: String,
    /// Default model to use for requests.
    default_model: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl OllamaClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL of the backend (e.g., "http://localhost:11434")
    /// * `default_model` - Model used when a request leaves `model` empty
    /// * `timeout` - Upper bound for a single generation call
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
            http_client,
        })
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Wire request for `/api/generate`.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(rename = "maxTokens")]
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

/// Wire response (or response fragment) from `/api/generate`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    response: Option<String>,
}

impl ApiResponse {
    fn into_generation(self) -> GenerationResponse {
        GenerationResponse {
            text: self.response.unwrap_or_default().trim().to_string(),
        }
    }
}

/// Error body returned by the backend on failure.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: String,
}

/// Decode a response body into generated text.
///
/// Accepts a single JSON object, or newline-delimited JSON fragments where
/// the last line that parses is authoritative.
pub(crate) fn decode_response_body(body: &str) -> Result<GenerationResponse, LlmError> {
    if let Ok(parsed) = serde_json::from_str::<ApiResponse>(body) {
        return Ok(parsed.into_generation());
    }

    body.lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| serde_json::from_str::<ApiResponse>(line).ok())
        .map(ApiResponse::into_generation)
        .ok_or_else(|| {
            let preview: String = body.trim().chars().take(100).collect();
            LlmError::MalformedResponse(format!("No JSON line in response body: '{}'", preview))
        })
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let api_request = ApiRequest {
            model,
            prompt: &request.prompt,
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            stream: false,
        };

        let url = format!("{}/api/generate", self.api_base);
        debug!(model, prompt_chars = request.prompt.len(), "Sending generation request");

        let http_response = self
            .http_client
            .post(&url)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::BackendUnavailable(e.to_string()))?;

        let status = http_response.status();
        let body = http_response
            .text()
            .await
            .map_err(|e| LlmError::BackendUnavailable(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::BackendUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message
            )));
        }

        decode_response_body(&body)
    }
}
