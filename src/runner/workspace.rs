//! Run-scoped test artifacts.
//!
//! Every test run gets its own directory, so file names inside it can stay
//! fixed (the generated test imports the module by name) while concurrent
//! runs on one host never collide. The directory is removed when the
//! [`TestArtifacts`] value is dropped, on every exit path.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::TestRunError;

/// File name used for the combined stdout/stderr capture.
const CAPTURE_FILE_NAME: &str = "output.log";

/// Fixed file names used inside a run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    /// Python module name the code is written to (without `.py`).
    pub module_name: String,
    /// File name of the generated test module.
    pub test_file_name: String,
}

impl ArtifactLayout {
    /// Layout for a module and the function under test.
    pub fn new(module_name: impl Into<String>, function_name: &str) -> Self {
        Self {
            module_name: module_name.into(),
            test_file_name: format!("test_{}.py", function_name),
        }
    }

    /// File name of the module under test.
    pub fn module_file_name(&self) -> String {
        format!("{}.py", self.module_name)
    }
}

/// Module and test sources materialized in a private directory.
#[derive(Debug)]
pub struct TestArtifacts {
    dir: TempDir,
    module_path: PathBuf,
    test_path: PathBuf,
}

impl TestArtifacts {
    /// Creates a unique run directory under `root` and writes both sources.
    ///
    /// If writing fails, the partially populated directory is removed before
    /// the error is returned.
    pub fn materialize(
        root: &Path,
        run_id: &str,
        layout: &ArtifactLayout,
        module_source: &str,
        test_source: &str,
    ) -> Result<Self, TestRunError> {
        std::fs::create_dir_all(root).map_err(|e| {
            TestRunError::Workspace(format!("Failed to create {}: {}", root.display(), e))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("agentforge-{}-", run_id))
            .tempdir_in(root)
            .map_err(|e| TestRunError::Workspace(format!("Failed to create run dir: {}", e)))?;

        let module_path = dir.path().join(layout.module_file_name());
        let test_path = dir.path().join(&layout.test_file_name);

        std::fs::write(&module_path, module_source)?;
        std::fs::write(&test_path, test_source)?;

        debug!(dir = %dir.path().display(), "Materialized test artifacts");

        Ok(Self {
            dir,
            module_path,
            test_path,
        })
    }

    /// Run directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    pub fn test_path(&self) -> &Path {
        &self.test_path
    }

    /// Path of the combined output capture file.
    pub fn capture_path(&self) -> PathBuf {
        self.dir.path().join(CAPTURE_FILE_NAME)
    }

    /// Creates the capture file that receives both output streams.
    pub fn create_capture_file(&self) -> Result<File, TestRunError> {
        Ok(File::create(self.capture_path())?)
    }

    /// Removes the run directory, logging instead of failing on cleanup errors.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(dir = %path.display(), error = %e, "Failed to remove test artifacts");
        }
    }
}
