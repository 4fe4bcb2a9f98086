//! Executes generated tests against generated code in a child process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TestRunError;

use super::workspace::{ArtifactLayout, TestArtifacts};

/// Result of one test execution.
///
/// A non-zero exit status is a normal outcome: generated tests can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunOutput {
    /// Combined stdout and stderr, in the order the child wrote them.
    pub output: String,
    /// Exit code, or `None` if the child was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    /// Whether the run was stopped by the timeout.
    pub timed_out: bool,
    /// Wall-clock duration of the child process.
    pub duration: Duration,
}

impl TestRunOutput {
    /// Returns true if the test command exited with status 0.
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.output.lines().map(str::to_string).collect()
    }
}

/// Something that can run a test module against a code module.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// Runs `test_source` against `module_source` and captures the output.
    async fn run(&self, module_source: &str, test_source: &str)
        -> Result<TestRunOutput, TestRunError>;
}

/// Configuration for [`PythonTestRunner`].
#[derive(Debug, Clone)]
pub struct TestRunnerConfig {
    /// Interpreter used as the host test facility.
    pub python: String,
    /// Parent directory for run-scoped artifact directories.
    pub work_dir: PathBuf,
    /// File layout inside each run directory.
    pub layout: ArtifactLayout,
    /// Wall-clock limit for the child process.
    pub timeout: Duration,
}

impl Default for TestRunnerConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            work_dir: std::env::temp_dir(),
            layout: ArtifactLayout::new("reverse_string_module", "reverse_string"),
            timeout: Duration::from_secs(60),
        }
    }
}

impl TestRunnerConfig {
    /// Sets the interpreter.
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// Sets the parent directory for run directories.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Sets the artifact layout.
    pub fn with_layout(mut self, layout: ArtifactLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs `python -m unittest <test file>` inside a private run directory.
pub struct PythonTestRunner {
    config: TestRunnerConfig,
}

impl PythonTestRunner {
    /// Creates a new runner.
    pub fn new(config: TestRunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the runner configuration.
    pub fn config(&self) -> &TestRunnerConfig {
        &self.config
    }

    async fn execute(&self, artifacts: &TestArtifacts) -> Result<TestRunOutput, TestRunError> {
        let stdout = artifacts.create_capture_file()?;
        let stderr = stdout.try_clone()?;

        let mut cmd = Command::new(&self.config.python);
        cmd.arg("-m")
            .arg("unittest")
            .arg(&self.config.layout.test_file_name)
            .current_dir(artifacts.path())
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| TestRunError::LaunchFailed {
            program: self.config.python.clone(),
            reason: e.to_string(),
        })?;

        let (exit_code, timed_out) = match tokio::time::timeout(self.config.timeout, child.wait()).await {
            Ok(status) => (status?.code(), false),
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout.as_secs(),
                    "Test run timed out, killing child"
                );
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out test process");
                }
                (None, true)
            }
        };
        let duration = start.elapsed();

        let bytes = tokio::fs::read(artifacts.capture_path()).await?;
        let mut output = String::from_utf8_lossy(&bytes).into_owned();
        if timed_out {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&format!(
                "Test run timed out after {} seconds",
                self.config.timeout.as_secs()
            ));
        }

        Ok(TestRunOutput {
            output,
            exit_code,
            timed_out,
            duration,
        })
    }
}

#[async_trait]
impl TestExecutor for PythonTestRunner {
    async fn run(
        &self,
        module_source: &str,
        test_source: &str,
    ) -> Result<TestRunOutput, TestRunError> {
        let run_id = Uuid::new_v4().simple().to_string();
        let artifacts = TestArtifacts::materialize(
            &self.config.work_dir,
            &run_id,
            &self.config.layout,
            module_source,
            test_source,
        )?;

        debug!(dir = %artifacts.path().display(), python = %self.config.python, "Running generated tests");

        // Cleanup happens in both arms: explicitly on success, by Drop on error.
        match self.execute(&artifacts).await {
            Ok(result) => {
                artifacts.close();
                info!(
                    exit_code = ?result.exit_code,
                    timed_out = result.timed_out,
                    elapsed_ms = result.duration.as_millis() as u64,
                    "Test run finished"
                );
                Ok(result)
            }
            Err(e) => {
                drop(artifacts);
                warn!(error = %e, "Test run could not be executed");
                Err(e)
            }
        }
    }
}
