//! HTTP server exposing the event stream.
//!
//! Routes:
//! - `GET /stream` runs the pipeline once and streams its frames as
//!   `text/event-stream`. Only one run may be active; a second request gets
//!   `409 Conflict`. Dropping the connection cancels the run.
//! - `GET /health` returns `ok`.
//! - `GET /` serves a small page that renders the stream.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pipeline::{PipelineError, PipelineOrchestrator};

use super::frames;

/// Capacity of the channel between a run and its response body.
const EVENT_BUFFER: usize = 16;

const INDEX_HTML: &str = include_str!("index.html");

/// Shared state of the HTTP server.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
    run_gate: Arc<Semaphore>,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            run_gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Returns true while a run is in progress.
    pub fn is_busy(&self) -> bool {
        self.run_gate.available_permits() == 0
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/stream", get(stream_pipeline))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Event stream server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

async fn stream_pipeline(State(state): State<AppState>) -> Response {
    let permit = match Arc::clone(&state.run_gate).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!("Rejected stream request, a run is already in progress");
            return (
                StatusCode::CONFLICT,
                "A pipeline run is already in progress\n",
            )
                .into_response();
        }
    };

    let body = Body::from_stream(spawn_run(Arc::clone(&state.orchestrator), permit));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// Starts a run in the background and returns its encoded frames.
///
/// The permit is held until the run has finished. Dropping the returned
/// stream cancels the run.
pub fn spawn_run(
    orchestrator: Arc<PipelineOrchestrator>,
    permit: OwnedSemaphorePermit,
) -> impl Stream<Item = Result<String, Infallible>> + Send + 'static {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    tokio::spawn(async move {
        let _permit = permit;
        match orchestrator.run(tx, cancel).await {
            Ok(output) => debug!(run_id = %output.run_id, "Streamed run finished"),
            Err(PipelineError::Cancelled) => info!("Stream consumer went away, run cancelled"),
            Err(e) => debug!(error = %e, "Streamed run failed"),
        }
    });

    frames(rx).map(move |frame| {
        let _guard = &guard;
        Ok(frame.encode())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, TestRunError};
    use crate::llm::{GenerationRequest, GenerationResponse, LlmProvider};
    use crate::pipeline::PipelineConfig;
    use crate::runner::{TestExecutor, TestRunOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock LLM provider that returns predetermined responses in order.
    struct MockLlmProvider {
        responses: Mutex<Vec<String>>,
    }

    impl MockLlmProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let mut responses = self.responses.lock().expect("lock not poisoned");
            let text = if responses.is_empty() {
                String::new()
            } else {
                responses.remove(0)
            };
            Ok(GenerationResponse { text })
        }
    }

    /// Sets a flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Provider that never answers and records when its call is abandoned.
    struct HangingProvider {
        abandoned: Arc<AtomicBool>,
    }

    #[async_trait]
    impl LlmProvider for HangingProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let _flag = DropFlag(Arc::clone(&self.abandoned));
            std::future::pending().await
        }
    }

    struct PassingExecutor;

    #[async_trait]
    impl TestExecutor for PassingExecutor {
        async fn run(&self, _: &str, _: &str) -> Result<TestRunOutput, TestRunError> {
            Ok(TestRunOutput {
                output: "OK".to_string(),
                exit_code: Some(0),
                timed_out: false,
                duration: Duration::from_millis(1),
            })
        }
    }

    fn orchestrator(llm: Arc<dyn LlmProvider>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(llm, Arc::new(PassingExecutor), PipelineConfig::default())
    }

    async fn spawn_server(state: AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router(state))
                .await
                .expect("server failed");
        });
        addr
    }

    #[tokio::test]
    async fn test_health() {
        let state = AppState::new(orchestrator(Arc::new(MockLlmProvider::new(&[]))));
        let addr = spawn_server(state).await;

        let body = reqwest::get(format!("http://{}/health", addr))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_index_page_listens_for_stream() {
        let state = AppState::new(orchestrator(Arc::new(MockLlmProvider::new(&[]))));
        let addr = spawn_server(state).await;

        let body = reqwest::get(format!("http://{}/", addr))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert!(body.contains("EventSource('/stream')"));
    }

    #[tokio::test]
    async fn test_stream_headers_and_terminal_frame() {
        let llm = Arc::new(MockLlmProvider::new(&[
            "```python\ndef reverse_string(s): return s[::-1]\n```",
            "looks good",
            "class T(unittest.TestCase):\n def test_x(self): pass",
            "docs",
        ]));
        let state = AppState::new(orchestrator(llm));
        let addr = spawn_server(state.clone()).await;

        let response = reqwest::get(format!("http://{}/stream", addr))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/event-stream")
        );
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-cache")
        );

        let body = response.text().await.expect("body");
        assert!(body.starts_with("event: status\ndata: Coder\n\nevent: coder\ndata: def reverse_string(s): return s[::-1]\n\n"));
        assert!(body.ends_with("event: documenter\ndata: docs\n\nevent: status\ndata: Done\n\n"));
    }

    #[tokio::test]
    async fn test_second_stream_is_rejected_while_busy() {
        let abandoned = Arc::new(AtomicBool::new(false));
        let state = AppState::new(orchestrator(Arc::new(HangingProvider {
            abandoned: Arc::clone(&abandoned),
        })));
        let addr = spawn_server(state.clone()).await;

        let first = reqwest::get(format!("http://{}/stream", addr))
            .await
            .expect("first request");
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        assert!(state.is_busy());

        let second = reqwest::get(format!("http://{}/stream", addr))
            .await
            .expect("second request");
        assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);

        drop(first);
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_run_and_frees_gate() {
        let abandoned = Arc::new(AtomicBool::new(false));
        let orch = Arc::new(orchestrator(Arc::new(HangingProvider {
            abandoned: Arc::clone(&abandoned),
        })));
        let gate = Arc::new(Semaphore::new(1));
        let permit = Arc::clone(&gate)
            .try_acquire_owned()
            .expect("gate is free");

        let mut stream = Box::pin(spawn_run(orch, permit));
        let first = stream.next().await.expect("first frame");
        assert_eq!(first, Ok("event: status\ndata: Coder\n\n".to_string()));
        assert_eq!(gate.available_permits(), 0);

        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !abandoned.load(Ordering::SeqCst) || gate.available_permits() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("run should be cancelled and release the gate");
    }
}
