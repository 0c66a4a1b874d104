//! End-to-end job flow over the state machine with stubbed engines.
//!
//! Uses the in-memory queue and a temp-dir storage/state root. The stub
//! local renderer writes placeholder clip bytes, so scene dispatch and the
//! record bookkeeping run for real; assembly then takes the template
//! fallback path, which is exactly the guarantee under test: every job
//! reaches a terminal state with its scene records complete.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;
use tokio::sync::watch;

use rforge_engines::{
    ClipValidator, EngineAdapter, EngineFailure, EngineManager, GeneratedClip, GenerateRequest,
    ValidationResult,
};
use rforge_models::{EngineId, JobStatus, RenderConfig, RenderRequest, SceneStatus};
use rforge_worker::{run_job, WorkerConfig, WorkerContext};

struct StubLocal;

#[async_trait]
impl EngineAdapter for StubLocal {
    fn id(&self) -> EngineId {
        EngineId::Local
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedClip, EngineFailure> {
        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| EngineFailure::Api(e.to_string()))?;
        let path = request
            .output_dir
            .join(format!("scene_{}.mp4", request.scene_id));
        tokio::fs::write(&path, b"clip")
            .await
            .map_err(|e| EngineFailure::Api(e.to_string()))?;
        Ok(GeneratedClip {
            clip_path: path,
            clip_url: None,
            generation_id: None,
            engine: EngineId::Local,
            elapsed_ms: 1,
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn max_duration(&self) -> f64 {
        60.0
    }

    fn supports_image_input(&self) -> bool {
        true
    }
}

struct AcceptAll;

#[async_trait]
impl ClipValidator for AcceptAll {
    async fn validate(&self, _path: &std::path::Path, _expected: f64) -> ValidationResult {
        ValidationResult {
            valid: true,
            ..Default::default()
        }
    }
}

async fn test_context(dir: &tempfile::TempDir) -> WorkerContext {
    let config = WorkerConfig {
        storage_root: dir.path().join("storage"),
        state_root: dir.path().join("state"),
        redis_url: None,
        ..WorkerConfig::default()
    };
    let mut ctx = WorkerContext::new(config).await.unwrap();

    // No external providers configured; the stub local renderer is the
    // terminal fallback for every scene.
    ctx.engines = Arc::new(
        EngineManager::new(Arc::new(RenderConfig::default()))
            .with_registry(HashMap::new())
            .with_local(Arc::new(StubLocal))
            .with_validator(Arc::new(AcceptAll)),
    );
    ctx
}

fn request() -> RenderRequest {
    let mut request = RenderRequest::new("product_hero_clean");
    request.prompt = "Product reveal. Key features. Call to action.".to_string();
    request.target_duration_seconds = 15;
    request
}

#[tokio::test]
async fn submit_persists_graph_and_enqueues() {
    let dir = tempdir().unwrap();
    let ctx = test_context(&dir).await;

    let job = ctx.submit_job(&request()).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.scene_graph_json.is_some());
    assert_eq!(ctx.queue.depth().await.unwrap(), 1);

    let key = format!("jobs/{}/scene_graph.json", job.id);
    assert!(ctx.store.exists(&key).await);
}

#[tokio::test]
async fn job_reaches_terminal_state_with_all_scenes_complete() {
    let dir = tempdir().unwrap();
    let ctx = test_context(&dir).await;

    let job = ctx.submit_job(&request()).await.unwrap();
    let queued = ctx.queue.pop_now().await.unwrap().unwrap();
    assert_eq!(queued.job_id, job.id.to_string());

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    run_job(&ctx, &job.id, cancel_rx).await.unwrap();

    let finished = ctx.jobs.get(&job.id).await.unwrap();
    assert!(finished.status.is_terminal());
    assert_eq!(finished.status, JobStatus::Done);
    assert_eq!(finished.progress_pct, 100.0);
    assert!(finished.timeline_json.is_some());

    // Every scene completed through the local fallback chain.
    let scenes = ctx.scenes.list_for_job(&job.id).await.unwrap();
    assert_eq!(scenes.len(), 3);
    for scene in &scenes {
        assert!(scene.status.is_complete());
        assert_eq!(scene.status, SceneStatus::Fallback);
        assert_eq!(scene.engine_used.as_deref(), Some("local"));
        assert!(scene.fallback_used);
        assert!(scene.asset_path.is_some());
    }
}

#[tokio::test]
async fn rerunning_a_terminal_job_is_a_noop() {
    let dir = tempdir().unwrap();
    let ctx = test_context(&dir).await;

    let job = ctx.submit_job(&request()).await.unwrap();
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    run_job(&ctx, &job.id, cancel_rx.clone()).await.unwrap();

    let first = ctx.jobs.get(&job.id).await.unwrap();
    run_job(&ctx, &job.id, cancel_rx).await.unwrap();
    let second = ctx.jobs.get(&job.id).await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.progress_pct, second.progress_pct);
}

#[tokio::test]
async fn completed_scenes_are_not_redispatched_on_resume() {
    let dir = tempdir().unwrap();
    let ctx = test_context(&dir).await;

    let job = ctx.submit_job(&request()).await.unwrap();
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    run_job(&ctx, &job.id, cancel_rx.clone()).await.unwrap();

    let before = ctx.scenes.list_for_job(&job.id).await.unwrap();
    let updated_before: Vec<_> = before.iter().map(|s| s.updated_at).collect();

    // Terminal job: nothing re-dispatches, records stay untouched.
    run_job(&ctx, &job.id, cancel_rx).await.unwrap();
    let after = ctx.scenes.list_for_job(&job.id).await.unwrap();
    let updated_after: Vec<_> = after.iter().map(|s| s.updated_at).collect();
    assert_eq!(updated_before, updated_after);
}
