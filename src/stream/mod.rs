//! Event stream for pipeline progress.
//!
//! Turns the orchestrator's [`PipelineEvent`]s into server-sent event
//! frames. Every stage produces a `status` frame naming the stage, then a
//! frame tagged with the stage's event name carrying its output lines. A
//! successful run ends with `status`/`Done`; a failed run ends with an
//! `error` frame. Frames are produced as soon as each event arrives.
//!
//! ```text
//! event: status
//! data: Coder
//!
//! event: coder
//! data: def reverse_string(s): return s[::-1]
//!
//! ...
//!
//! event: status
//! data: Done
//! ```

pub mod frame;
pub mod server;

pub use frame::{Frame, DONE_STATUS, ERROR_EVENT, STATUS_EVENT};
pub use server::{router, serve, AppState};

use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::pipeline::PipelineEvent;

/// Frames for the events received on `rx`, ending after the terminal event
/// or when the sender goes away.
pub fn frames(rx: mpsc::Receiver<PipelineEvent>) -> impl Stream<Item = Frame> + Send + 'static {
    futures::stream::unfold(Some(rx), |state| async move {
        let mut rx = state?;
        let event = rx.recv().await?;
        let next = if event.is_terminal() { None } else { Some(rx) };
        Some((Frame::from_event(&event), next))
    })
}

/// Writes the encoded frames to `writer`, flushing after every frame.
///
/// Returns the number of frames written.
pub async fn write_frames<W>(
    rx: mpsc::Receiver<PipelineEvent>,
    writer: &mut W,
) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut frames = Box::pin(frames(rx));
    let mut written = 0;

    while let Some(frame) = frames.next().await {
        writer.write_all(frame.encode().as_bytes()).await?;
        writer.flush().await?;
        written += 1;
    }

    Ok(written)
}
