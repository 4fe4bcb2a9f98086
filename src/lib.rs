//! agentforge: Multi-agent code generation pipeline.
//!
//! This library runs a fixed sequence of role-bound model calls (Coder,
//! Tester, TestAgent, Documenter) against a coding task, runs the generated
//! tests against the generated code, and streams progress as server-sent
//! events.

// Core modules
pub mod agents;
pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod runner;
pub mod stream;
pub mod utils;

// Re-export commonly used error types
pub use error::{LlmError, TestRunError};
pub use pipeline::{ConfigError, PipelineError};
