//! Pipeline orchestration for multi-agent code generation.
//!
//! # Architecture
//!
//! The pipeline consists of several components:
//!
//! - **Orchestrator**: Runs the five fixed stages and emits events
//! - **Events**: Stage-tagged progress events consumed by the event stream
//! - **Refinement loop**: Review-and-revise cycle between Coder and Tester
//! - **Config**: Configuration for all pipeline components
//!
//! # Pipeline Flow
//!
//! 1. **Coder**: Writes code for the task; the fenced block is extracted
//! 2. **Tester**: Reviews the code
//! 3. **TestAgent**: Writes unit tests, prefixed with a fixed import preamble
//! 4. **TestRunner**: Runs the tests against the code in a private directory
//! 5. **Documenter**: Documents the code
//!
//! Each stage emits `StageStarted` and `StageCompleted`; the run ends with
//! `PipelineCompleted`, or with `PipelineFailed` naming the failed stage.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentforge::pipeline::{PipelineConfig, PipelineOrchestrator};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = PipelineConfig::from_env()?.with_model("codellama");
//! let orchestrator = PipelineOrchestrator::from_config(config)?;
//!
//! let (tx, mut rx) = mpsc::channel(32);
//! tokio::spawn(async move { orchestrator.run(tx, CancellationToken::new()).await });
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod refine;

// Re-export main types for convenience
pub use config::{ConfigError, PipelineConfig};
pub use events::{split_lines, PipelineEvent, Stage};
pub use orchestrator::{
    synthesize_test_module, PipelineError, PipelineOrchestrator, PipelineOutput, TestStageOutcome,
};
pub use refine::{
    is_approval, RefinementLoop, RefinementReport, RefinementRound, DEFAULT_MAX_ROUNDS,
};
