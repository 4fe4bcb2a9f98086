//! Pipeline orchestrator.
//!
//! Drives the fixed stage sequence Coder → Tester → TestAgent → TestRunner →
//! Documenter and reports progress through a channel of [`PipelineEvent`]s.
//! Stages run strictly one after another; the Coder's code is the only
//! artifact threaded into later stages.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::AgentRoster;
use crate::error::{LlmError, TestRunError};
use crate::llm::{LlmProvider, OllamaClient};
use crate::prompts::{
    build_documentation_instruction, build_review_instruction, build_test_instruction,
    test_module_preamble,
};
use crate::runner::{PythonTestRunner, TestExecutor, TestRunOutput};
use crate::utils::try_extract_code;

use super::config::{ConfigError, PipelineConfig};
use super::events::{PipelineEvent, Stage};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    TestRun(#[from] TestRunError),

    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of the test stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStageOutcome {
    /// The tests ran; they may have passed or failed.
    Completed(TestRunOutput),
    /// The test process could not be started.
    LaunchFailed(String),
}

impl TestStageOutcome {
    /// Text reported for the stage.
    pub fn report(&self) -> String {
        match self {
            TestStageOutcome::Completed(output) => output.output.clone(),
            TestStageOutcome::LaunchFailed(reason) => {
                format!("Test run could not be started: {}", reason)
            }
        }
    }

    /// Returns true if the tests ran and passed.
    pub fn passed(&self) -> bool {
        matches!(self, TestStageOutcome::Completed(output) if output.passed())
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Identifier of the run, as logged.
    pub run_id: Uuid,
    /// Code extracted from the Coder.
    pub code: String,
    /// Review extracted from the Tester.
    pub review: String,
    /// Synthesized test module.
    pub tests: String,
    /// Result of running the tests.
    pub test_outcome: TestStageOutcome,
    /// Documentation extracted from the Documenter.
    pub documentation: String,
}

/// Builds the test module run against the generated code.
///
/// The import preamble makes the function under test available whatever
/// imports the generated body already has.
pub fn synthesize_test_module(module: &str, function: &str, body: &str) -> String {
    format!("{}\n{}", test_module_preamble(module, function), body)
}

/// Runs the five-stage pipeline for one task.
pub struct PipelineOrchestrator {
    roster: AgentRoster,
    test_runner: Arc<dyn TestExecutor>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator from a backend and a test executor.
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        test_runner: Arc<dyn TestExecutor>,
        config: PipelineConfig,
    ) -> Self {
        let roster = AgentRoster::new(llm, &config.model, config.sampling);
        Self {
            roster,
            test_runner,
            config,
        }
    }

    /// Creates an orchestrator using the Ollama backend and the Python test
    /// runner described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let llm = OllamaClient::new(&config.api_base, &config.model, config.request_timeout)?;
        let test_runner = PythonTestRunner::new(config.test_runner_config());

        Ok(Self::new(Arc::new(llm), Arc::new(test_runner), config))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the agents used by this orchestrator.
    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// Runs the pipeline, emitting events to `event_tx`.
    ///
    /// Each stage emits `StageStarted` then `StageCompleted`. After the last
    /// stage a `PipelineCompleted` event is sent. If a stage fails, a
    /// `PipelineFailed` event is sent and no later stage runs. If `cancel`
    /// fires or the receiver is dropped, the in-flight stage is abandoned and
    /// `PipelineError::Cancelled` is returned without a terminal event.
    pub async fn run(
        &self,
        event_tx: mpsc::Sender<PipelineEvent>,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();

        info!(
            run_id = %run_id,
            model = %self.config.model,
            "Starting pipeline run"
        );

        // Stage 1: Coder
        let code = self
            .run_stage(&event_tx, &cancel, Stage::Coder, String::clone, async {
                let raw = self.roster.coder.generate(&self.config.task).await?;
                Ok::<_, PipelineError>(extract(Stage::Coder, &raw))
            })
            .await?;

        // Stage 2: Tester
        let review = self
            .run_stage(&event_tx, &cancel, Stage::Tester, String::clone, async {
                let raw = self
                    .roster
                    .tester
                    .generate(&build_review_instruction(&code))
                    .await?;
                Ok::<_, PipelineError>(extract(Stage::Tester, &raw))
            })
            .await?;

        // Stage 3: TestAgent
        let tests = self
            .run_stage(&event_tx, &cancel, Stage::TestAgent, String::clone, async {
                let raw = self
                    .roster
                    .test_agent
                    .generate(&build_test_instruction(&code))
                    .await?;
                let body = extract(Stage::TestAgent, &raw);
                Ok::<_, PipelineError>(synthesize_test_module(
                    &self.config.target_module,
                    &self.config.target_function,
                    &body,
                ))
            })
            .await?;

        // Stage 4: run the tests
        let test_outcome = self
            .run_stage(
                &event_tx,
                &cancel,
                Stage::TestRunner,
                TestStageOutcome::report,
                self.run_tests(&code, &tests),
            )
            .await?;

        // Stage 5: Documenter
        let documentation = self
            .run_stage(&event_tx, &cancel, Stage::Documenter, String::clone, async {
                let raw = self
                    .roster
                    .documenter
                    .generate(&build_documentation_instruction(&code))
                    .await?;
                Ok::<_, PipelineError>(extract(Stage::Documenter, &raw))
            })
            .await?;

        self.send_event(&event_tx, PipelineEvent::pipeline_completed())
            .await;

        info!(
            run_id = %run_id,
            tests_passed = test_outcome.passed(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline run completed"
        );

        Ok(PipelineOutput {
            run_id,
            code,
            review,
            tests,
            test_outcome,
            documentation,
        })
    }

    /// Runs one stage between its started and completed events.
    async fn run_stage<T, R, F>(
        &self,
        event_tx: &mpsc::Sender<PipelineEvent>,
        cancel: &CancellationToken,
        stage: Stage,
        render: R,
        stage_fut: F,
    ) -> Result<T, PipelineError>
    where
        R: FnOnce(&T) -> String,
        F: Future<Output = Result<T, PipelineError>>,
    {
        if cancel.is_cancelled() || event_tx.is_closed() {
            info!(stage = %stage, "Pipeline cancelled before stage");
            return Err(PipelineError::Cancelled);
        }

        self.send_event(event_tx, PipelineEvent::stage_started(stage))
            .await;
        let stage_start = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            _ = event_tx.closed() => Err(PipelineError::Cancelled),
            result = stage_fut => result,
        };

        match result {
            Ok(value) => {
                debug!(
                    stage = %stage,
                    elapsed_ms = stage_start.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                self.send_event(
                    event_tx,
                    PipelineEvent::stage_completed(stage, &render(&value)),
                )
                .await;
                Ok(value)
            }
            Err(PipelineError::Cancelled) => {
                info!(stage = %stage, "Pipeline cancelled during stage");
                Err(PipelineError::Cancelled)
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage failed, aborting pipeline");
                self.send_event(event_tx, PipelineEvent::pipeline_failed(stage, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// Runs the generated tests, applying the launch-failure policy.
    async fn run_tests(&self, code: &str, tests: &str) -> Result<TestStageOutcome, PipelineError> {
        match self.test_runner.run(code, tests).await {
            Ok(output) => Ok(TestStageOutcome::Completed(output)),
            Err(e @ TestRunError::LaunchFailed { .. })
                if self.config.continue_on_test_launch_failure =>
            {
                warn!(error = %e, "Test launch failed, continuing with documentation");
                Ok(TestStageOutcome::LaunchFailed(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sends an event to the event channel.
    async fn send_event(&self, event_tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) {
        // Ignore send errors - receiver may have been dropped
        let _ = event_tx.send(event).await;
    }
}

/// Extracts the payload of an agent answer, noting unfenced answers.
fn extract(stage: Stage, raw: &str) -> String {
    let extracted = try_extract_code(raw);
    if !extracted.is_fenced() {
        debug!(stage = %stage, "No fenced block in agent output, using whole text");
    }
    extracted.code
}
