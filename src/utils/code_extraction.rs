//! Code extraction from free-form model output.
//!
//! Models usually wrap code in markdown fences, sometimes with prose around
//! it. The extractor returns the trimmed interior of the FIRST fenced block,
//! or the trimmed input when no fenced block exists. Later blocks are
//! ignored on purpose: downstream stages rely on first-match semantics.
//!
//! # Example
//!
//! ```
//! use agentforge::utils::code_extraction::extract_code;
//!
//! let response = "Here you go:\n```python\ndef f():\n    return 1\n```\nEnjoy.";
//! assert_eq!(extract_code(response), "def f():\n    return 1");
//!
//! // No fence: the whole text is the payload.
//! assert_eq!(extract_code("  x = 1  "), "x = 1");
//! ```

use regex::Regex;
use std::sync::OnceLock;

/// Opening fence, optional language hint, newline, lazily-matched body, closing fence.
const FENCE_PATTERN: &str = r"(?s)```[\w+.#-]*[ \t]*\r?\n(.*?)```";

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(FENCE_PATTERN).ok()).as_ref()
}

/// How the payload was located in the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionConfidence {
    /// The payload came from a fenced block.
    Fenced,
    /// No fenced block was found; the payload is the whole trimmed text.
    Unfenced,
}

/// Result of a code extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCode {
    /// Extracted payload, trimmed.
    pub code: String,
    /// Whether the payload came from a fence.
    pub confidence: ExtractionConfidence,
}

impl ExtractedCode {
    /// Returns true if the payload came from a fenced block.
    pub fn is_fenced(&self) -> bool {
        self.confidence == ExtractionConfidence::Fenced
    }
}

/// Extract code and report whether a fence was found.
pub fn try_extract_code(text: &str) -> ExtractedCode {
    let fenced = fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string());

    match fenced {
        Some(code) => ExtractedCode {
            code,
            confidence: ExtractionConfidence::Fenced,
        },
        None => ExtractedCode {
            code: text.trim().to_string(),
            confidence: ExtractionConfidence::Unfenced,
        },
    }
}

/// Extract the best-effort code payload from model output.
pub fn extract_code(text: &str) -> String {
    try_extract_code(text).code
}
