//! Text-generation backend integration.
//!
//! Agents depend on the [`LlmProvider`] trait only; [`OllamaClient`] is the
//! production implementation speaking the Ollama `/api/generate` protocol.
//!
//! ```ignore
//! use std::time::Duration;
//! use agentforge::llm::{GenerationRequest, LlmProvider, OllamaClient, DEFAULT_API_BASE};
//!
//! let client = OllamaClient::new(DEFAULT_API_BASE, "mistral", Duration::from_secs(300))?;
//! let response = client
//!     .generate(GenerationRequest::new("mistral", "Say hello"))
//!     .await?;
//! println!("{}", response.text);
//! ```

pub mod ollama;

pub use ollama::{
    GenerationRequest, GenerationResponse, LlmProvider, OllamaClient, SamplingParams,
    DEFAULT_API_BASE, DEFAULT_MODEL,
};
