//! The four fixed agent identities used by the pipeline.

use std::sync::Arc;

use crate::llm::{LlmProvider, SamplingParams};

use crate::prompts::OPEN_RESPONSE_DIRECTIVE;

use super::agent::{Agent, ArtifactKind};

pub const CODER_NAME: &str = "Coder";
pub const CODER_ROLE: &str = "an expert Python developer who writes clear, efficient code";

pub const TESTER_NAME: &str = "Tester";
pub const TESTER_ROLE: &str =
    "a meticulous code reviewer who finds bugs and suggests improvements";

pub const TEST_AGENT_NAME: &str = "TestAgent";
pub const TEST_AGENT_ROLE: &str = "a Python testing expert who writes and runs unittest tests";

pub const DOCUMENTER_NAME: &str = "Documenter";
pub const DOCUMENTER_ROLE: &str =
    "a technical writer who creates detailed docstrings and examples";

pub const REFINEMENT_CODER_ROLE: &str =
    "an expert Python developer who writes clear, efficient, and bug-free code";
pub const REFINEMENT_TESTER_ROLE: &str =
    "a meticulous code reviewer who finds bugs and suggests improvements following best practices";
pub const REFINEMENT_DOCUMENTER_ROLE: &str =
    "a technical writer who writes comprehensive docstrings, usage examples, and readme sections";

/// The agents of one pipeline, all sharing a backend, model and sampling.
#[derive(Debug)]
pub struct AgentRoster {
    pub coder: Agent,
    pub tester: Agent,
    pub test_agent: Agent,
    pub documenter: Agent,
}

impl AgentRoster {
    /// Builds the standard roster.
    pub fn new(llm: Arc<dyn LlmProvider>, model: &str, sampling: SamplingParams) -> Self {
        let agent = |name: &str, role: &str, artifact: ArtifactKind| {
            Agent::new(name, role, model, artifact, Arc::clone(&llm)).with_sampling(sampling)
        };

        Self {
            coder: agent(CODER_NAME, CODER_ROLE, ArtifactKind::Code),
            tester: agent(TESTER_NAME, TESTER_ROLE, ArtifactKind::Review),
            test_agent: agent(TEST_AGENT_NAME, TEST_AGENT_ROLE, ArtifactKind::Tests),
            documenter: agent(DOCUMENTER_NAME, DOCUMENTER_ROLE, ArtifactKind::Documentation),
        }
    }
}

/// The agents of the review-and-revise loop.
///
/// Their answers are free-form, so every prompt ends with an open directive
/// instead of an artifact-only one.
#[derive(Debug)]
pub struct RefinementRoster {
    pub coder: Agent,
    pub tester: Agent,
    pub documenter: Agent,
}

impl RefinementRoster {
    pub fn new(llm: Arc<dyn LlmProvider>, model: &str, sampling: SamplingParams) -> Self {
        let agent = |name: &str, role: &str, artifact: ArtifactKind| {
            Agent::new(name, role, model, artifact, Arc::clone(&llm))
                .with_sampling(sampling)
                .with_directive(OPEN_RESPONSE_DIRECTIVE)
        };

        Self {
            coder: agent(CODER_NAME, REFINEMENT_CODER_ROLE, ArtifactKind::Code),
            tester: agent(TESTER_NAME, REFINEMENT_TESTER_ROLE, ArtifactKind::Review),
            documenter: agent(
                DOCUMENTER_NAME,
                REFINEMENT_DOCUMENTER_ROLE,
                ArtifactKind::Documentation,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{GenerationRequest, GenerationResponse};
    use async_trait::async_trait;

    struct NullProvider;

    #[async_trait]
    impl LlmProvider for NullProvider {
        async fn generate(&self, _: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            Ok(GenerationResponse::default())
        }
    }

    #[test]
    fn test_roster_identities() {
        let sampling = SamplingParams {
            max_tokens: 64,
            temperature: 0.0,
        };
        let roster = AgentRoster::new(Arc::new(NullProvider), "llama3", sampling);

        assert_eq!(roster.coder.name(), "Coder");
        assert_eq!(roster.tester.name(), "Tester");
        assert_eq!(roster.test_agent.name(), "TestAgent");
        assert_eq!(roster.documenter.name(), "Documenter");

        for agent in [&roster.coder, &roster.tester, &roster.test_agent, &roster.documenter] {
            assert_eq!(agent.model(), "llama3");
            assert_eq!(agent.sampling(), sampling);
        }

        assert_eq!(roster.test_agent.artifact(), ArtifactKind::Tests);
        assert_eq!(roster.documenter.artifact(), ArtifactKind::Documentation);
    }

    #[test]
    fn test_refinement_roster_uses_open_directive() {
        let roster = RefinementRoster::new(Arc::new(NullProvider), "mistral", SamplingParams::default());

        assert_eq!(roster.coder.role(), REFINEMENT_CODER_ROLE);
        assert_eq!(roster.tester.role(), REFINEMENT_TESTER_ROLE);
        assert_eq!(roster.documenter.role(), REFINEMENT_DOCUMENTER_ROLE);
        for agent in [&roster.coder, &roster.tester, &roster.documenter] {
            assert!(agent.prompt_for("x").ends_with("\nProvide your response below:"));
        }
        assert!(!roster.tester.prompt_for("x").contains("patched"));
    }
}
