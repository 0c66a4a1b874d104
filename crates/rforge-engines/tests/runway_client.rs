//! Runway client behavior against a mocked provider API.

use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rforge_engines::{EngineAdapter, EngineFailure, GenerateRequest, RunwayEngine};
use rforge_models::{EngineId, EngineSettings};

fn engine(server: &MockServer, timeout_seconds: u64) -> RunwayEngine {
    RunwayEngine::new(EngineSettings {
        enabled: true,
        timeout_seconds,
        max_clip_duration_seconds: 10.0,
    })
    .with_api_key("test-key")
    .with_base_url(server.uri())
    .with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn submit_poll_download_happy_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image_to_video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1"})))
        .mount(&server)
        .await;

    let clip_url = format!("{}/files/clip.mp4", server.uri());
    Mock::given(method("GET"))
        .and(path("/tasks/task-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "SUCCEEDED", "output": [clip_url]})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "a calm product shot", 5.0, dir.path());

    let clip = engine(&server, 10).generate(&request).await.unwrap();
    assert_eq!(clip.engine, EngineId::Runway);
    assert_eq!(clip.generation_id.as_deref(), Some("task-1"));
    let bytes = tokio::fs::read(&clip.clip_path).await.unwrap();
    assert_eq!(bytes, b"mp4-bytes");
}

#[tokio::test]
async fn submit_rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image_to_video"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "prompt", 5.0, dir.path());

    let err = engine(&server, 10).generate(&request).await.unwrap_err();
    assert!(matches!(err, EngineFailure::RateLimited));
}

#[tokio::test]
async fn submit_moderation_rejection_is_flagged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image_to_video"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"error": "Input failed content moderation"})),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "prompt", 5.0, dir.path());

    let err = engine(&server, 10).generate(&request).await.unwrap_err();
    assert!(matches!(err, EngineFailure::ModerationRejection(_)));
    assert_eq!(err.code(), "moderation_rejection");
}

#[tokio::test]
async fn poll_failure_with_moderation_hint_is_flagged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image_to_video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-2"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks/task-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"status": "FAILED", "failure": "moderation: unsafe content"}),
        ))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "prompt", 5.0, dir.path());

    let err = engine(&server, 10).generate(&request).await.unwrap_err();
    assert!(matches!(err, EngineFailure::ModerationRejection(_)));
}

#[tokio::test]
async fn poll_deadline_yields_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/image_to_video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-3"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tasks/task-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "prompt", 5.0, dir.path());

    let err = engine(&server, 1).generate(&request).await.unwrap_err();
    assert!(matches!(err, EngineFailure::Timeout(1)));
}

#[tokio::test]
async fn missing_api_key_short_circuits() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let request = GenerateRequest::new(1, "prompt", 5.0, dir.path());

    let err = engine(&server, 10)
        .with_api_key("")
        .generate(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineFailure::MissingApiKey(_)));
    assert_eq!(err.code(), "missing_api_key");
}
