//! Review-and-revise loop between the Coder and the Tester.
//!
//! The Coder writes code for the task, then for up to `max_rounds` the
//! Tester reviews it and the Coder revises it using the review. The loop
//! ends early when the review approves the code. The Documenter documents
//! the final code.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::agents::RefinementRoster;
use crate::llm::{LlmProvider, OllamaClient};
use crate::prompts::{
    build_refinement_documentation_instruction, build_refinement_review_instruction,
    build_revision_instruction,
};
use crate::utils::extract_code;

use super::config::PipelineConfig;
use super::orchestrator::PipelineError;

/// Default number of review rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

/// Phrases that mark a review as approving the code.
const APPROVAL_PHRASES: [&str; 2] = ["no issues", "looks good"];

/// Returns true if a review approves the code as it is.
pub fn is_approval(review: &str) -> bool {
    let review = review.to_lowercase();
    APPROVAL_PHRASES.iter().any(|phrase| review.contains(phrase))
}

/// One review round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefinementRound {
    /// Round number, starting at 1.
    pub round: usize,
    /// Review produced by the Tester.
    pub feedback: String,
    /// Code after revision, or `None` if the review approved the code.
    pub revised_code: Option<String>,
}

impl RefinementRound {
    /// Returns true if this round approved the code.
    pub fn approved(&self) -> bool {
        self.revised_code.is_none()
    }
}

/// Everything a refinement run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementReport {
    pub task: String,
    pub initial_code: String,
    pub rounds: Vec<RefinementRound>,
    pub final_code: String,
    pub documentation: String,
}

/// Runs the review-and-revise loop.
pub struct RefinementLoop {
    roster: RefinementRoster,
    max_rounds: usize,
}

impl RefinementLoop {
    /// Creates a loop using the model and sampling from `config`.
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            roster: RefinementRoster::new(llm, &config.model, config.sampling),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Creates a loop talking to the Ollama backend described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let llm = OllamaClient::new(&config.api_base, &config.model, config.request_timeout)?;
        Ok(Self::new(Arc::new(llm), config))
    }

    /// Sets the maximum number of review rounds.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Runs the loop for `task`.
    ///
    /// Backend errors end the run; nothing is retried.
    pub async fn run(&self, task: &str) -> Result<RefinementReport, PipelineError> {
        let start = Instant::now();
        info!(max_rounds = self.max_rounds, "Starting refinement loop");

        let initial_code = extract_code(&self.roster.coder.generate(task).await?);
        let mut code = initial_code.clone();
        let mut rounds = Vec::new();

        for round in 1..=self.max_rounds {
            let raw_review = self
                .roster
                .tester
                .generate(&build_refinement_review_instruction(&code))
                .await?;
            let feedback = extract_code(&raw_review);

            if is_approval(&raw_review) {
                info!(round, "Review approved the code");
                rounds.push(RefinementRound {
                    round,
                    feedback,
                    revised_code: None,
                });
                break;
            }

            // The Coder gets the whole review, prose included.
            let revised = extract_code(
                &self
                    .roster
                    .coder
                    .generate(&build_revision_instruction(&raw_review, &code))
                    .await?,
            );
            debug!(round, lines = revised.lines().count(), "Coder revised the code");

            code = revised.clone();
            rounds.push(RefinementRound {
                round,
                feedback,
                revised_code: Some(revised),
            });
        }

        let documentation = extract_code(
            &self
                .roster
                .documenter
                .generate(&build_refinement_documentation_instruction(&code))
                .await?,
        );

        info!(
            rounds = rounds.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Refinement loop completed"
        );

        Ok(RefinementReport {
            task: task.to_string(),
            initial_code,
            rounds,
            final_code: code,
            documentation,
        })
    }
}
