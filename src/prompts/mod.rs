//! Prompt texts for each agent and pipeline stage.
//!
//! The agent prompt wraps every instruction in the same frame (identity,
//! instruction, artifact directive). The stage builders below produce the
//! instruction part; each embeds the Coder's code verbatim at the end.

/// Default coding task given to the Coder.
pub const DEFAULT_TASK: &str =
    "Write a Python function `reverse_string(input_str: str) -> str` that returns the reversed string.";

/// Closing directive for agents whose answer is free-form.
pub const OPEN_RESPONSE_DIRECTIVE: &str = "Provide your response below:";

/// Frame used for every agent prompt.
const AGENT_PROMPT_TEMPLATE: &str = "You are {name}, {role}.\nInstruction: {instruction}\n{directive}";

/// Builds the full prompt sent to the backend for one agent call.
pub fn build_agent_prompt(name: &str, role: &str, instruction: &str, directive: &str) -> String {
    AGENT_PROMPT_TEMPLATE
        .replace("{name}", name)
        .replace("{role}", role)
        .replace("{directive}", directive)
        // Last, so text inside the instruction is never re-substituted.
        .replace("{instruction}", instruction)
}

/// Review request for the Tester stage.
pub fn build_review_instruction(code: &str) -> String {
    format!(
        "Review the code and suggest fixes (only output code if patch):\n{}",
        code
    )
}

/// Test-writing request for the TestAgent stage.
pub fn build_test_instruction(code: &str) -> String {
    format!(
        "Write Python unittest tests for this function, including import statements:\n{}",
        code
    )
}

/// Documentation request for the Documenter stage.
pub fn build_documentation_instruction(code: &str) -> String {
    format!(
        "Write a detailed docstring with examples and edge case descriptions for the following code:\n{}",
        code
    )
}

/// Revision request used by the refinement loop.
pub fn build_revision_instruction(feedback: &str, code: &str) -> String {
    format!(
        "Improve the code based on this feedback:\n{}\nOriginal code:\n{}",
        feedback, code
    )
}

/// Open-ended review request used by the refinement loop.
pub fn build_refinement_review_instruction(code: &str) -> String {
    format!(
        "Review the following code and suggest bug fixes or improvements:\n{}",
        code
    )
}

/// Final documentation request used by the refinement loop.
pub fn build_refinement_documentation_instruction(code: &str) -> String {
    format!(
        "Write a detailed docstring for the following function, include type hints, examples, and edge case descriptions:\n{}",
        code
    )
}

/// Fixed import preamble placed in front of generated test bodies.
pub fn test_module_preamble(module: &str, function: &str) -> String {
    format!("from {} import {}\nimport unittest\n", module, function)
}
