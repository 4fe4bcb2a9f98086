//! A role-bound wrapper around a single text-generation call.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider, SamplingParams};
use crate::prompts::build_agent_prompt;

/// Kind of artifact an agent is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Code,
    Review,
    Tests,
    Documentation,
}

impl ArtifactKind {
    /// Directive appended to the prompt so the answer contains only the artifact.
    pub fn directive(&self) -> &'static str {
        match self {
            ArtifactKind::Code => "Provide only the code (no explanation).",
            ArtifactKind::Review => {
                "Provide only the review, or the patched code if you propose a patch (no explanation)."
            }
            ArtifactKind::Tests => "Provide only the test code (no explanation).",
            ArtifactKind::Documentation => "Provide only the documentation (no explanation).",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Code => write!(f, "code"),
            ArtifactKind::Review => write!(f, "review"),
            ArtifactKind::Tests => write!(f, "tests"),
            ArtifactKind::Documentation => write!(f, "documentation"),
        }
    }
}

/// A named agent bound to a model and a backend.
///
/// Agents keep no conversation state: every call sends exactly one prompt,
/// and anything from earlier stages must be embedded in the instruction.
pub struct Agent {
    name: String,
    role: String,
    model: String,
    artifact: ArtifactKind,
    directive: String,
    sampling: SamplingParams,
    llm: Arc<dyn LlmProvider>,
}

impl Agent {
    /// Creates a new agent with default sampling parameters.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        model: impl Into<String>,
        artifact: ArtifactKind,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            model: model.into(),
            artifact,
            directive: artifact.directive().to_string(),
            sampling: SamplingParams::default(),
            llm,
        }
    }

    /// Sets the sampling parameters used for every call.
    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Replaces the closing directive of the prompt.
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn artifact(&self) -> ArtifactKind {
        self.artifact
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    /// Formats the prompt for an instruction. Deterministic.
    pub fn prompt_for(&self, instruction: &str) -> String {
        build_agent_prompt(&self.name, &self.role, instruction, &self.directive)
    }

    /// Generates the artifact for an instruction.
    ///
    /// Backend errors are returned unchanged.
    pub async fn generate(&self, instruction: &str) -> Result<String, LlmError> {
        let request = GenerationRequest::new(&self.model, self.prompt_for(instruction))
            .with_sampling(self.sampling);

        debug!(agent = %self.name, model = %self.model, artifact = %self.artifact, "Agent generating");
        let response = self.llm.generate(request).await?;
        Ok(response.text)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("model", &self.model)
            .field("artifact", &self.artifact)
            .field("directive", &self.directive)
            .field("sampling", &self.sampling)
            .finish_non_exhaustive()
    }
}
