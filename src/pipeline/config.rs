//! Pipeline configuration.
//!
//! This module provides configuration options for a pipeline run: the
//! generation backend, sampling parameters, the coding task, and the test
//! runner settings.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{SamplingParams, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::prompts::DEFAULT_TASK;
use crate::runner::{ArtifactLayout, TestRunnerConfig};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Backend settings
    /// Base URL of the generation backend.
    pub api_base: String,
    /// Model used by every agent.
    pub model: String,
    /// Sampling parameters used by every agent.
    pub sampling: SamplingParams,
    /// Timeout for a single generation call.
    pub request_timeout: Duration,

    // Task settings
    /// The coding task given to the Coder.
    pub task: String,
    /// Module name the generated code is saved as.
    pub target_module: String,
    /// Function the generated tests import.
    pub target_function: String,

    // Test runner settings
    /// Interpreter used to run the generated tests.
    pub python: String,
    /// Wall-clock limit for the test run.
    pub test_timeout: Duration,
    /// Parent directory for run-scoped artifact directories.
    pub work_dir: PathBuf,
    /// Whether the Documenter still runs when the test child cannot be launched.
    pub continue_on_test_launch_failure: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            sampling: SamplingParams::default(),
            request_timeout: Duration::from_secs(300),

            task: DEFAULT_TASK.to_string(),
            target_module: "reverse_string_module".to_string(),
            target_function: "reverse_string".to_string(),

            python: "python3".to_string(),
            test_timeout: Duration::from_secs(60),
            work_dir: std::env::temp_dir(),
            continue_on_test_launch_failure: true,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AGENTFORGE_API_BASE`: Backend URL (default: http://localhost:11434)
    /// - `AGENTFORGE_MODEL`: Model for all agents (default: mistral)
    /// - `AGENTFORGE_MAX_TOKENS`: Max tokens per call (default: 512)
    /// - `AGENTFORGE_TEMPERATURE`: Sampling temperature (default: 0.7)
    /// - `AGENTFORGE_REQUEST_TIMEOUT_SECS`: Generation timeout (default: 300)
    /// - `AGENTFORGE_TASK`: Coding task (default: reverse_string task)
    /// - `AGENTFORGE_TARGET_MODULE`: Module name (default: reverse_string_module)
    /// - `AGENTFORGE_TARGET_FUNCTION`: Function name (default: reverse_string)
    /// - `AGENTFORGE_PYTHON`: Interpreter (default: python3)
    /// - `AGENTFORGE_TEST_TIMEOUT_SECS`: Test run timeout (default: 60)
    /// - `AGENTFORGE_WORK_DIR`: Parent of run directories (default: system temp dir)
    /// - `AGENTFORGE_CONTINUE_ON_TEST_LAUNCH_FAILURE`: (default: true)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::parse_lookup(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads variables from `lookup` without validating the result.
    ///
    /// Use this when more overrides are applied before [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn parse_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("AGENTFORGE_API_BASE") {
            config.api_base = val;
        }

        if let Some(val) = lookup("AGENTFORGE_MODEL") {
            config.model = val;
        }

        if let Some(val) = lookup("AGENTFORGE_MAX_TOKENS") {
            config.sampling.max_tokens = parse_env_value(&val, "AGENTFORGE_MAX_TOKENS")?;
        }

        if let Some(val) = lookup("AGENTFORGE_TEMPERATURE") {
            config.sampling.temperature = parse_env_value(&val, "AGENTFORGE_TEMPERATURE")?;
        }

        if let Some(val) = lookup("AGENTFORGE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "AGENTFORGE_REQUEST_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("AGENTFORGE_TASK") {
            config.task = val;
        }

        if let Some(val) = lookup("AGENTFORGE_TARGET_MODULE") {
            config.target_module = val;
        }

        if let Some(val) = lookup("AGENTFORGE_TARGET_FUNCTION") {
            config.target_function = val;
        }

        if let Some(val) = lookup("AGENTFORGE_PYTHON") {
            config.python = val;
        }

        if let Some(val) = lookup("AGENTFORGE_TEST_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "AGENTFORGE_TEST_TIMEOUT_SECS")?;
            config.test_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("AGENTFORGE_WORK_DIR") {
            config.work_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("AGENTFORGE_CONTINUE_ON_TEST_LAUNCH_FAILURE") {
            config.continue_on_test_launch_failure =
                parse_env_bool(&val, "AGENTFORGE_CONTINUE_ON_TEST_LAUNCH_FAILURE")?;
        }

        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api_base cannot be empty".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if self.sampling.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.sampling.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.task.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "task cannot be empty".to_string(),
            ));
        }

        if !is_python_identifier(&self.target_module) {
            return Err(ConfigError::ValidationFailed(format!(
                "target_module '{}' is not a valid Python identifier",
                self.target_module
            )));
        }

        if !is_python_identifier(&self.target_function) {
            return Err(ConfigError::ValidationFailed(format!(
                "target_function '{}' is not a valid Python identifier",
                self.target_function
            )));
        }

        if self.python.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "python cannot be empty".to_string(),
            ));
        }

        if self.test_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "test_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// File layout for the test run.
    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.target_module, &self.target_function)
    }

    /// Test runner configuration derived from this configuration.
    pub fn test_runner_config(&self) -> TestRunnerConfig {
        TestRunnerConfig::default()
            .with_python(&self.python)
            .with_work_dir(&self.work_dir)
            .with_layout(self.artifact_layout())
            .with_timeout(self.test_timeout)
    }

    /// Builder method to set the backend URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method to set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = max_tokens;
        self
    }

    /// Builder method to set temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    /// Builder method to set the generation timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder method to set the coding task.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Builder method to set the module and function under test.
    pub fn with_target(mut self, module: impl Into<String>, function: impl Into<String>) -> Self {
        self.target_module = module.into();
        self.target_function = function.into();
        self
    }

    /// Builder method to set the interpreter.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Builder method to set the test timeout.
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Builder method to set the work directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Builder method to set whether a test launch failure stops the run.
    pub fn continue_on_test_launch_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_test_launch_failure = continue_on_failure;
        self
    }
}

/// Returns true for names usable in `from <module> import <function>`.
fn is_python_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.api_base, "http://localhost:11434");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.sampling.max_tokens, 512);
        assert!((config.sampling.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.target_module, "reverse_string_module");
        assert_eq!(config.target_function, "reverse_string");
        assert!(config.task.contains("reverse_string"));
        assert!(config.continue_on_test_launch_failure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = PipelineConfig::from_lookup(|_| None).expect("defaults are valid");
        assert_eq!(config.model, PipelineConfig::default().model);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("AGENTFORGE_API_BASE", "http://gpu-box:11434"),
            ("AGENTFORGE_MODEL", "codellama"),
            ("AGENTFORGE_MAX_TOKENS", "1024"),
            ("AGENTFORGE_TEMPERATURE", "0.2"),
            ("AGENTFORGE_TASK", "Write fizzbuzz"),
            ("AGENTFORGE_TARGET_MODULE", "fizz"),
            ("AGENTFORGE_TARGET_FUNCTION", "fizzbuzz"),
            ("AGENTFORGE_TEST_TIMEOUT_SECS", "5"),
            ("AGENTFORGE_WORK_DIR", "/var/tmp/agentforge"),
            ("AGENTFORGE_CONTINUE_ON_TEST_LAUNCH_FAILURE", "no"),
        ]))
        .expect("config should load");

        assert_eq!(config.api_base, "http://gpu-box:11434");
        assert_eq!(config.model, "codellama");
        assert_eq!(config.sampling.max_tokens, 1024);
        assert!((config.sampling.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.task, "Write fizzbuzz");
        assert_eq!(config.test_timeout, Duration::from_secs(5));
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/agentforge"));
        assert!(!config.continue_on_test_launch_failure);

        let layout = config.artifact_layout();
        assert_eq!(layout.module_file_name(), "fizz.py");
        assert_eq!(layout.test_file_name, "test_fizzbuzz.py");
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("AGENTFORGE_MAX_TOKENS", "lots")]))
            .expect_err("should fail");
        assert!(err.to_string().contains("AGENTFORGE_MAX_TOKENS"));
    }

    #[test]
    fn test_parse_lookup_defers_validation() {
        let config = PipelineConfig::parse_lookup(lookup_from(&[("AGENTFORGE_MODEL", "")]))
            .expect("parsing alone does not validate");
        assert!(config.model.is_empty());
        assert!(config.validate().is_err());

        assert!(PipelineConfig::parse_lookup(lookup_from(&[("AGENTFORGE_MAX_TOKENS", "lots")]))
            .is_err());
    }

    #[test]
    fn test_from_lookup_runs_validation() {
        let err = PipelineConfig::from_lookup(lookup_from(&[("AGENTFORGE_TEMPERATURE", "5")]))
            .expect_err("should fail");
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validation_rejects_bad_identifiers() {
        let config = PipelineConfig::default().with_target("my-module", "f");
        assert!(config.validate().unwrap_err().to_string().contains("target_module"));

        let config = PipelineConfig::default().with_target("m", "1f");
        assert!(config.validate().unwrap_err().to_string().contains("target_function"));

        let config = PipelineConfig::default().with_target("m", "f; import os");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_and_zero_values() {
        assert!(PipelineConfig::default().with_model("").validate().is_err());
        assert!(PipelineConfig::default().with_api_base("").validate().is_err());
        assert!(PipelineConfig::default().with_task("   ").validate().is_err());
        assert!(PipelineConfig::default().with_max_tokens(0).validate().is_err());
        assert!(PipelineConfig::default().with_python("").validate().is_err());
        assert!(PipelineConfig::default()
            .with_test_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(PipelineConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_test_runner_config_mirrors_pipeline() {
        let config = PipelineConfig::default()
            .with_python("/usr/bin/python3.12")
            .with_work_dir("/tmp/runs")
            .with_test_timeout(Duration::from_secs(9));

        let runner = config.test_runner_config();
        assert_eq!(runner.python, "/usr/bin/python3.12");
        assert_eq!(runner.work_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(runner.timeout, Duration::from_secs(9));
        assert_eq!(runner.layout, config.artifact_layout());
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("true", "test").unwrap());
        assert!(parse_env_bool("ON", "test").unwrap());
        assert!(!parse_env_bool("0", "test").unwrap());
        assert!(parse_env_bool("maybe", "test").is_err());
    }
}
