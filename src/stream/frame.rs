//! Server-sent event frames.

use crate::pipeline::{split_lines, PipelineEvent, Stage};

/// Event name of status markers.
pub const STATUS_EVENT: &str = "status";
/// Event name of error frames.
pub const ERROR_EVENT: &str = "error";
/// Status value sent after the last stage.
pub const DONE_STATUS: &str = "Done";

/// One frame of the event stream: an event name and its data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: Vec<String>,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Vec<String>) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Status marker carrying a single value.
    pub fn status(value: impl Into<String>) -> Self {
        Self::new(STATUS_EVENT, vec![value.into()])
    }

    /// Terminal status marker.
    pub fn done() -> Self {
        Self::status(DONE_STATUS)
    }

    /// Error frame: the failed stage on the first line, then the message.
    pub fn error(stage: Stage, message: &str) -> Self {
        let mut data = vec![stage.display_name().to_string()];
        data.extend(split_lines(message));
        Self::new(ERROR_EVENT, data)
    }

    /// Frame for a pipeline event.
    pub fn from_event(event: &PipelineEvent) -> Self {
        match event {
            PipelineEvent::StageStarted { stage, .. } => Self::status(stage.display_name()),
            PipelineEvent::StageCompleted { stage, payload, .. } => {
                Self::new(stage.tag(), payload.clone())
            }
            PipelineEvent::PipelineFailed { stage, error, .. } => Self::error(*stage, error),
            PipelineEvent::PipelineCompleted { .. } => Self::done(),
        }
    }

    /// Returns true if this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.event == ERROR_EVENT
            || (self.event == STATUS_EVENT && self.data.len() == 1 && self.data[0] == DONE_STATUS)
    }

    /// Wire form: `event:` line, one `data:` line per payload line, blank line.
    ///
    /// An empty payload is sent as a single empty `data:` line so clients
    /// still dispatch the event.
    pub fn encode(&self) -> String {
        let mut out = format!("event: {}\n", self.event);
        if self.data.is_empty() {
            out.push_str("data: \n");
        }
        for line in &self.data {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
