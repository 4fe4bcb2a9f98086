//! Shared utility functions for agentforge.
//!
//! This module provides helpers used across stages, most importantly code
//! extraction from free-form LLM responses.

pub mod code_extraction;

pub use code_extraction::{extract_code, try_extract_code, ExtractedCode, ExtractionConfidence};
