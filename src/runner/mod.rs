//! Test runner for generated code.
//!
//! # Architecture
//!
//! ```text
//! module source + test source → TestArtifacts (private dir) → child process → TestRunOutput
//! ```
//!
//! The runner:
//! 1. Materializes both sources in a run-scoped directory
//! 2. Runs the host test facility against the test file
//! 3. Captures stdout and stderr as one interleaved text
//! 4. Removes the directory, whatever happened
//!
//! # Example
//!
//! ```ignore
//! use agentforge::runner::{PythonTestRunner, TestExecutor, TestRunnerConfig};
//!
//! let runner = PythonTestRunner::new(TestRunnerConfig::default());
//! let result = runner.run("def f(): return 1", tests).await?;
//! println!("exit={:?}\n{}", result.exit_code, result.output);
//! ```

pub mod test_runner;
pub mod workspace;

pub use test_runner::{PythonTestRunner, TestExecutor, TestRunOutput, TestRunnerConfig};
pub use workspace::{ArtifactLayout, TestArtifacts};
