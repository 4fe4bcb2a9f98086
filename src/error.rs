//! Error types for agentforge operations.
//!
//! Defines the error kinds raised by the two external boundaries of the
//! pipeline:
//! - The text-generation backend
//! - The host test-execution facility

use thiserror::Error;

/// Errors that can occur while talking to the text-generation backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Generation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur while executing generated tests.
///
/// A failing test suite is not an error: a non-zero exit status is reported
/// through [`crate::runner::TestRunOutput`].
#[derive(Debug, Error)]
pub enum TestRunError {
    #[error("Failed to launch '{program}': {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Failed to prepare test workspace: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
