//! Events emitted while a pipeline run progresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Splits `text` into lines at `\r\n`, `\r` or `\n`.
///
/// A trailing line break does not produce an empty last line. Event stream
/// readers end a line at any of the three, so a payload line must not
/// contain a bare `\r`.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\r' || c == '\n') {
            Some(i) => {
                lines.push(rest[..i].to_string());
                let skip = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + skip..];
            }
            None => {
                lines.push(rest.to_string());
                break;
            }
        }
    }
    lines
}

/// Stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Writes the code for the task.
    Coder,
    /// Reviews the code.
    Tester,
    /// Writes unit tests for the code.
    TestAgent,
    /// Runs the generated tests against the code.
    TestRunner,
    /// Documents the code.
    Documenter,
}

impl Stage {
    /// Returns all stages in order.
    pub fn all() -> [Stage; 5] {
        [
            Stage::Coder,
            Stage::Tester,
            Stage::TestAgent,
            Stage::TestRunner,
            Stage::Documenter,
        ]
    }

    /// Tag of the event carrying this stage's output.
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Coder => "coder",
            Stage::Tester => "tester",
            Stage::TestAgent => "testagent",
            Stage::TestRunner => "test_results",
            Stage::Documenter => "documenter",
        }
    }

    /// Name announced in the status marker before the stage runs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Coder => "Coder",
            Stage::Tester => "Tester",
            Stage::TestAgent => "TestAgent",
            Stage::TestRunner => "TestRunner",
            Stage::Documenter => "Documenter",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Events emitted during a pipeline run, in production order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A stage is about to run.
    StageStarted {
        /// The stage that started.
        stage: Stage,
        /// Timestamp of the event.
        timestamp: DateTime<Utc>,
    },
    /// A stage produced its output.
    StageCompleted {
        /// The stage that completed.
        stage: Stage,
        /// Output of the stage, one entry per line.
        payload: Vec<String>,
        /// Timestamp of the event.
        timestamp: DateTime<Utc>,
    },
    /// A stage failed and the run was aborted.
    PipelineFailed {
        /// The stage that failed.
        stage: Stage,
        /// Error message.
        error: String,
        /// Timestamp of the event.
        timestamp: DateTime<Utc>,
    },
    /// Every stage completed.
    PipelineCompleted {
        /// Timestamp of the event.
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Creates a stage started event.
    pub fn stage_started(stage: Stage) -> Self {
        PipelineEvent::StageStarted {
            stage,
            timestamp: Utc::now(),
        }
    }

    /// Creates a stage completed event, splitting `output` into lines.
    pub fn stage_completed(stage: Stage, output: &str) -> Self {
        PipelineEvent::StageCompleted {
            stage,
            payload: split_lines(output),
            timestamp: Utc::now(),
        }
    }

    /// Creates a pipeline failed event.
    pub fn pipeline_failed(stage: Stage, error: impl Into<String>) -> Self {
        PipelineEvent::PipelineFailed {
            stage,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a pipeline completed event.
    pub fn pipeline_completed() -> Self {
        PipelineEvent::PipelineCompleted {
            timestamp: Utc::now(),
        }
    }

    /// Returns true if no event follows this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::PipelineFailed { .. } | PipelineEvent::PipelineCompleted { .. }
        )
    }
}
