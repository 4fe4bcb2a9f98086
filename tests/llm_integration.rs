//! Integration tests against a live Ollama daemon.
//!
//! These tests make real calls to the backend at AGENTFORGE_API_BASE
//! (default http://localhost:11434) with the model in AGENTFORGE_MODEL.
//! Run with: cargo test --test llm_integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use agentforge::llm::{GenerationRequest, LlmProvider, OllamaClient, SamplingParams};
use agentforge::pipeline::{PipelineConfig, PipelineEvent, PipelineOrchestrator, RefinementLoop};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn test_config() -> PipelineConfig {
    PipelineConfig::from_env().expect("AGENTFORGE_* environment must be valid")
}

fn create_test_client(config: &PipelineConfig) -> OllamaClient {
    OllamaClient::new(&config.api_base, &config.model, Duration::from_secs(300))
        .expect("client should build")
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let config = test_config();
    let client = create_test_client(&config);

    let request = GenerationRequest::new(
        &config.model,
        "What is 2 + 2? Reply with just the number.",
    )
    .with_sampling(SamplingParams {
        max_tokens: 10,
        temperature: 0.0,
    });

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let text = response.expect("Should have response").text;
    assert!(text.contains('4'), "Response should contain '4', got: {}", text);
}

#[tokio::test]
#[ignore]
async fn test_full_pipeline_run() {
    let config = test_config();
    let orchestrator =
        PipelineOrchestrator::from_config(config).expect("orchestrator should build");

    let (tx, mut rx) = mpsc::channel(16);
    let run = tokio::spawn(async move { orchestrator.run(tx, CancellationToken::new()).await });

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    let output = run
        .await
        .expect("pipeline task should not panic")
        .expect("pipeline should complete");

    assert!(!output.code.is_empty(), "Coder should produce code");
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::PipelineCompleted { .. })
    ));
    println!("Test output:\n{}", output.test_outcome.report());
}

#[tokio::test]
#[ignore]
async fn test_refinement_loop() {
    let config = test_config();
    let client = Arc::new(create_test_client(&config));

    let report = RefinementLoop::new(client, &config)
        .with_max_rounds(1)
        .run(&config.task)
        .await
        .expect("refinement should complete");

    assert!(!report.final_code.is_empty());
    assert!(report.rounds.len() <= 1);
}
