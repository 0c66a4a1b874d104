//! The engine manager: per-scene selection, three-level fallback, and
//! bounded-concurrency scene dispatch.
//!
//! Within one scene the fallback chain is strictly sequential; across
//! scenes dispatch is concurrent behind a semaphore. Exceptions never
//! escape the fan-out: every scene yields a [`SceneRenderResult`], and the
//! returned sequence preserves scene order regardless of completion order.

use metrics::{counter, histogram};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{error, info, warn};

use rforge_models::{EngineId, Preset, RenderConfig, SceneGraph};

use crate::adapter::{EngineAdapter, GeneratedClip, GenerateRequest};
use crate::local::LocalRenderer;
use crate::luma::LumaEngine;
use crate::pika::PikaEngine;
use crate::prompt::{moderation_blocked, rephrase_for_moderation};
use crate::rotation::FailureTracker;
use crate::runway::RunwayEngine;
use crate::selector::{fallback_chain, select_engine_for_scene, EngineAssignment, SelectorOptions};
use crate::validator::{ClipValidator, ProbeValidator};

/// Options for one fan-out run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub brand_safe: bool,
    pub preset_id: String,
    /// Explicit user engine override from the render request.
    pub engine_override: Option<EngineId>,
}

/// Final outcome of rendering a single scene, after all fallback attempts.
#[derive(Debug, Clone)]
pub struct SceneRenderResult {
    pub scene_id: u32,
    pub success: bool,
    pub clip_path: Option<PathBuf>,
    pub engine_used: Option<EngineId>,
    pub fallback_used: bool,
    /// Engines attempted, in order.
    pub fallback_chain: Vec<EngineId>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl SceneRenderResult {
    fn failed(scene_id: u32, chain: Vec<EngineId>, elapsed_ms: u64, error: String) -> Self {
        Self {
            scene_id,
            success: false,
            clip_path: None,
            engine_used: None,
            fallback_used: true,
            fallback_chain: chain,
            elapsed_ms,
            error: Some(error),
        }
    }
}

enum AttemptError {
    Moderation(String),
    Other(String),
}

impl AttemptError {
    fn message(&self) -> &str {
        match self {
            AttemptError::Moderation(msg) | AttemptError::Other(msg) => msg,
        }
    }
}

/// Converts scenes into playable clips with a three-level fallback
/// guarantee.
pub struct EngineManager {
    config: Arc<RenderConfig>,
    registry: HashMap<EngineId, Arc<dyn EngineAdapter>>,
    local: Arc<dyn EngineAdapter>,
    validator: Arc<dyn ClipValidator>,
    tracker: FailureTracker,
    max_concurrent: usize,
}

impl EngineManager {
    /// Wire up the default provider registry from configuration.
    pub fn new(config: Arc<RenderConfig>) -> Self {
        let mut registry: HashMap<EngineId, Arc<dyn EngineAdapter>> = HashMap::new();
        registry.insert(
            EngineId::Runway,
            Arc::new(RunwayEngine::from_config(&config)),
        );
        registry.insert(EngineId::Pika, Arc::new(PikaEngine::from_config(&config)));
        registry.insert(EngineId::Luma, Arc::new(LumaEngine::from_config(&config)));

        let local: Arc<dyn EngineAdapter> = Arc::new(LocalRenderer::new(
            config.output.width,
            config.output.height,
            config.output.fps,
        ));

        Self {
            config,
            registry,
            local,
            validator: Arc::new(ProbeValidator::default()),
            tracker: FailureTracker::new(),
            max_concurrent: 3,
        }
    }

    /// Replace the provider registry (tests, new providers).
    pub fn with_registry(
        mut self,
        registry: HashMap<EngineId, Arc<dyn EngineAdapter>>,
    ) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the terminal local renderer.
    pub fn with_local(mut self, local: Arc<dyn EngineAdapter>) -> Self {
        self.local = local;
        self
    }

    /// Replace the clip validator.
    pub fn with_validator(mut self, validator: Arc<dyn ClipValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Set the scene fan-out width.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Advisory failure tracker (process-local).
    pub fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    /// Log provider health at startup. Informational only; availability is
    /// re-checked per attempt.
    pub async fn log_health(&self) {
        for (engine, adapter) in &self.registry {
            let healthy = adapter.health_check().await;
            info!(engine = %engine, healthy, "engine health");
        }
    }

    /// Render every scene of the graph concurrently.
    ///
    /// Results preserve scene order. Each completed chain is published to
    /// `progress` as it finishes; the caller uses that to update records
    /// incrementally.
    pub async fn render_all(
        self: Arc<Self>,
        graph: &SceneGraph,
        output_dir: &Path,
        options: &RenderOptions,
        progress: Option<mpsc::Sender<SceneRenderResult>>,
        cancel: watch::Receiver<bool>,
    ) -> Vec<SceneRenderResult> {
        let preset = Preset::lookup(&options.preset_id);

        let assignments: Vec<EngineAssignment> = graph
            .scenes
            .iter()
            .map(|scene| {
                select_engine_for_scene(
                    scene,
                    &SelectorOptions {
                        config: self.config.as_ref(),
                        preset,
                        brand_safe: options.brand_safe,
                        engine_override: options.engine_override,
                        tracker: Some(&self.tracker),
                    },
                )
            })
            .collect();

        info!(
            assignments = ?assignments
                .iter()
                .map(|a| (a.scene_id, a.engine))
                .collect::<Vec<_>>(),
            "engine assignments"
        );

        let alternates = fallback_chain(self.config.as_ref(), &options.preset_id);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let scene_id = assignment.scene_id;
            let manager = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            let output_dir = output_dir.to_path_buf();
            let alternates = alternates.clone();
            let progress = progress.clone();
            let cancel = cancel.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return SceneRenderResult::failed(
                            scene_id,
                            Vec::new(),
                            0,
                            "dispatch semaphore closed".to_string(),
                        )
                    }
                };
                let result = manager
                    .render_with_fallback(assignment, &output_dir, &alternates, cancel)
                    .await;
                if let Some(tx) = &progress {
                    tx.send(result.clone()).await.ok();
                }
                result
            });
            handles.push((scene_id, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (scene_id, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(scene_id, error = %e, "scene render task panicked");
                    results.push(SceneRenderResult::failed(
                        scene_id,
                        Vec::new(),
                        0,
                        format!("render task panicked: {e}"),
                    ));
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let fallbacks = results.iter().filter(|r| r.fallback_used).count();
        info!(
            total = results.len(),
            succeeded, fallbacks, "scene fan-out complete"
        );
        results
    }

    /// Render one scene through the three-level fallback chain.
    async fn render_with_fallback(
        &self,
        assignment: EngineAssignment,
        output_dir: &Path,
        alternates: &[EngineId],
        cancel: watch::Receiver<bool>,
    ) -> SceneRenderResult {
        let started = Instant::now();
        let scene_id = assignment.scene_id;
        let primary = assignment.engine;
        let mut chain: Vec<EngineId> = Vec::new();
        let mut last_error: Option<String> = None;

        // Strict moderation pre-screen keeps flagged prompts off external
        // providers entirely.
        let screened_out = primary != EngineId::Local
            && moderation_blocked(&assignment.prompt, &self.config.content_moderation);
        if screened_out {
            warn!(scene_id, "prompt blocked by strict moderation, using local renderer");
        }

        if primary != EngineId::Local && !screened_out {
            // Level 1: primary engine, with one moderation-rephrase retry.
            if let Some(adapter) = self.adapter_for(primary) {
                if *cancel.borrow() {
                    return SceneRenderResult::failed(
                        scene_id,
                        chain,
                        started.elapsed().as_millis() as u64,
                        "cancelled".to_string(),
                    );
                }
                chain.push(primary);
                match self
                    .attempt(adapter.as_ref(), &assignment, &assignment.prompt, output_dir, &cancel)
                    .await
                {
                    Ok(clip) => {
                        return self.success(scene_id, primary, false, chain, clip, started)
                    }
                    Err(AttemptError::Moderation(msg)) => {
                        info!(scene_id, engine = %primary, "moderation rejection, rephrasing once");
                        last_error = Some(msg);
                        let rephrased = rephrase_for_moderation(
                            &assignment.prompt,
                            &self.config.prompt_sanitization,
                        );
                        match self
                            .attempt(adapter.as_ref(), &assignment, &rephrased, output_dir, &cancel)
                            .await
                        {
                            Ok(clip) => {
                                return self.success(scene_id, primary, false, chain, clip, started)
                            }
                            Err(e) => last_error = Some(e.message().to_string()),
                        }
                    }
                    Err(e) => last_error = Some(e.message().to_string()),
                }
            }

            // Level 2: alternate engines in configured order.
            for alternate in alternates.iter().filter(|e| **e != primary) {
                if *cancel.borrow() {
                    break;
                }
                let Some(adapter) = self.adapter_for(*alternate) else {
                    continue;
                };
                chain.push(*alternate);
                info!(scene_id, from = %primary, to = %alternate, "engine fallback");
                match self
                    .attempt(adapter.as_ref(), &assignment, &assignment.prompt, output_dir, &cancel)
                    .await
                {
                    Ok(clip) => {
                        return self.success(scene_id, *alternate, true, chain, clip, started)
                    }
                    Err(e) => last_error = Some(e.message().to_string()),
                }
            }
        }

        if *cancel.borrow() {
            return SceneRenderResult::failed(
                scene_id,
                chain,
                started.elapsed().as_millis() as u64,
                "cancelled".to_string(),
            );
        }

        // Level 3: the deterministic local renderer.
        if !chain.is_empty() {
            warn!(scene_id, engines_tried = ?chain, "falling back to local renderer");
        }
        chain.push(EngineId::Local);
        let request = self.request_for(&assignment, &assignment.prompt, output_dir, &cancel);
        match self.local.generate(&request).await {
            Ok(clip) => {
                // Fallback only counts when an external path was expected.
                let fallback_used = primary != EngineId::Local;
                self.success(scene_id, EngineId::Local, fallback_used, chain, clip, started)
            }
            Err(e) => {
                error!(scene_id, error = %e, "local renderer failed");
                let message = match last_error {
                    Some(last) => format!("local renderer failed: {e} (after: {last})"),
                    None => format!("local renderer failed: {e}"),
                };
                SceneRenderResult::failed(
                    scene_id,
                    chain,
                    started.elapsed().as_millis() as u64,
                    message,
                )
            }
        }
    }

    /// One generate-then-validate attempt against a single adapter.
    async fn attempt(
        &self,
        adapter: &dyn EngineAdapter,
        assignment: &EngineAssignment,
        prompt: &str,
        output_dir: &Path,
        cancel: &watch::Receiver<bool>,
    ) -> Result<GeneratedClip, AttemptError> {
        let request = self.request_for(assignment, prompt, output_dir, cancel);
        let engine = adapter.id();

        match adapter.generate(&request).await {
            Ok(clip) => {
                let verdict = self
                    .validator
                    .validate(&clip.clip_path, assignment.duration_seconds)
                    .await;
                if verdict.valid {
                    self.tracker.record(engine, true);
                    Ok(clip)
                } else {
                    self.tracker.record(engine, false);
                    warn!(
                        scene_id = assignment.scene_id,
                        engine = %engine,
                        errors = ?verdict.errors,
                        "clip validation failed"
                    );
                    counter!("rforge_clip_validation_failures").increment(1);
                    Err(AttemptError::Other(format!(
                        "clip validation failed: {}",
                        verdict.errors.join("; ")
                    )))
                }
            }
            Err(failure) => {
                self.tracker.record(engine, false);
                warn!(
                    scene_id = assignment.scene_id,
                    engine = %engine,
                    code = failure.code(),
                    "engine attempt failed"
                );
                counter!("rforge_engine_failures").increment(1);
                if failure.is_moderation() {
                    Err(AttemptError::Moderation(failure.to_string()))
                } else {
                    Err(AttemptError::Other(failure.to_string()))
                }
            }
        }
    }

    fn request_for(
        &self,
        assignment: &EngineAssignment,
        prompt: &str,
        output_dir: &Path,
        cancel: &watch::Receiver<bool>,
    ) -> GenerateRequest {
        let mut request = GenerateRequest::new(
            assignment.scene_id,
            prompt,
            assignment.duration_seconds,
            output_dir,
        );
        request.width = self.config.output.width;
        request.height = self.config.output.height;
        request.image_path = assignment.image_path.as_ref().map(PathBuf::from);
        request.style_hints = assignment.style_hints.clone();
        request.cancel = cancel.clone();
        request
    }

    fn adapter_for(&self, engine: EngineId) -> Option<Arc<dyn EngineAdapter>> {
        if !self.config.engines.settings(engine).enabled {
            return None;
        }
        self.registry
            .get(&engine)
            .filter(|adapter| adapter.has_credentials())
            .cloned()
    }

    fn success(
        &self,
        scene_id: u32,
        engine: EngineId,
        fallback_used: bool,
        chain: Vec<EngineId>,
        clip: GeneratedClip,
        started: Instant,
    ) -> SceneRenderResult {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        histogram!("rforge_scene_render_seconds").record(elapsed_ms as f64 / 1000.0);
        counter!("rforge_scene_render_total").increment(1);
        if fallback_used {
            counter!("rforge_scene_fallbacks").increment(1);
        }
        SceneRenderResult {
            scene_id,
            success: true,
            clip_path: Some(clip.clip_path),
            engine_used: Some(engine),
            fallback_used,
            fallback_chain: chain,
            elapsed_ms,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EngineFailure;
    use crate::validator::ValidationResult;
    use async_trait::async_trait;
    use rforge_models::{
        GlobalAudio, Scene, SceneGraph, SceneMedia, SceneStyle, TransitionType,
    };
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// What a stub attempt should do, per call index.
    #[derive(Clone)]
    enum StubStep {
        Clip,
        Moderation,
        ApiError,
    }

    struct StubEngine {
        engine: EngineId,
        steps: Vec<StubStep>,
        calls: Mutex<usize>,
        prompts: Mutex<Vec<String>>,
        credentialed: bool,
        delay_ms: u64,
    }

    impl StubEngine {
        fn new(engine: EngineId, steps: Vec<StubStep>) -> Self {
            Self {
                engine,
                steps,
                calls: Mutex::new(0),
                prompts: Mutex::new(Vec::new()),
                credentialed: true,
                delay_ms: 0,
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EngineAdapter for StubEngine {
        fn id(&self) -> EngineId {
            self.engine
        }

        fn has_credentials(&self) -> bool {
            self.credentialed
        }

        async fn generate(
            &self,
            request: &GenerateRequest,
        ) -> Result<GeneratedClip, EngineFailure> {
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let current = *calls;
                *calls += 1;
                current
            };
            self.prompts.lock().unwrap().push(request.prompt.clone());

            let step = self
                .steps
                .get(call)
                .or_else(|| self.steps.last())
                .cloned()
                .unwrap_or(StubStep::ApiError);
            match step {
                StubStep::Clip => {
                    tokio::fs::create_dir_all(&request.output_dir).await.unwrap();
                    let path = request
                        .output_dir
                        .join(format!("{}_{}.mp4", self.name(), request.scene_id));
                    tokio::fs::write(&path, b"clip").await.unwrap();
                    Ok(GeneratedClip {
                        clip_path: path,
                        clip_url: None,
                        generation_id: None,
                        engine: self.engine,
                        elapsed_ms: 1,
                    })
                }
                StubStep::Moderation => {
                    Err(EngineFailure::ModerationRejection("flagged".to_string()))
                }
                StubStep::ApiError => Err(EngineFailure::Api("boom".to_string())),
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn max_duration(&self) -> f64 {
            10.0
        }

        fn supports_image_input(&self) -> bool {
            true
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl ClipValidator for AcceptAll {
        async fn validate(&self, _path: &Path, _expected: f64) -> ValidationResult {
            ValidationResult {
                valid: true,
                ..Default::default()
            }
        }
    }

    struct RejectAll;

    #[async_trait]
    impl ClipValidator for RejectAll {
        async fn validate(&self, _path: &Path, _expected: f64) -> ValidationResult {
            ValidationResult {
                valid: false,
                errors: vec!["resolution 400x800 below minimum 720x1280".to_string()],
                ..Default::default()
            }
        }
    }

    fn graph(n: u32) -> SceneGraph {
        let scenes = (1..=n)
            .map(|id| Scene {
                id,
                description: format!("a quiet morning {id}"),
                duration: 5_000,
                media: SceneMedia::Video {
                    engine: None,
                    prompt: Some(format!("a quiet morning {id}")),
                    asset: None,
                },
                caption: String::new(),
                style: SceneStyle::default(),
                overlays: Vec::new(),
                transition: TransitionType::Fade,
            })
            .collect();
        SceneGraph::new(scenes, GlobalAudio::default()).unwrap()
    }

    fn options() -> RenderOptions {
        RenderOptions {
            brand_safe: true,
            preset_id: "product_hero_clean".to_string(),
            engine_override: None,
        }
    }

    fn manager_with(
        registry: HashMap<EngineId, Arc<dyn EngineAdapter>>,
        local: Arc<dyn EngineAdapter>,
        validator: Arc<dyn ClipValidator>,
    ) -> Arc<EngineManager> {
        Arc::new(
            EngineManager::new(Arc::new(RenderConfig::default()))
                .with_registry(registry)
                .with_local(local)
                .with_validator(validator),
        )
    }

    fn never_cancelled() -> watch::Receiver<bool> {
        // A dropped sender leaves the last value (false) readable.
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn test_all_providers_unavailable_falls_back_to_local() {
        let dir = tempdir().unwrap();
        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(HashMap::new(), local, Arc::new(AcceptAll));

        let results = manager
            .render_all(&graph(3), dir.path(), &options(), None, never_cancelled())
            .await;

        assert_eq!(results.len(), 3);
        for result in &results {
            assert!(result.success);
            assert_eq!(result.engine_used, Some(EngineId::Local));
            assert!(result.fallback_used);
            assert!(result.clip_path.as_ref().unwrap().exists());
        }
    }

    #[tokio::test]
    async fn test_results_preserve_scene_order() {
        let dir = tempdir().unwrap();
        let local = Arc::new(StubEngine {
            delay_ms: 5,
            ..StubEngine::new(EngineId::Local, vec![StubStep::Clip])
        });
        let manager = manager_with(HashMap::new(), local, Arc::new(AcceptAll));

        let results = manager
            .render_all(&graph(5), dir.path(), &options(), None, never_cancelled())
            .await;
        let ids: Vec<u32> = results.iter().map(|r| r.scene_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_alternate_engine_rescues_failed_primary() {
        let dir = tempdir().unwrap();
        let runway = Arc::new(StubEngine::new(EngineId::Runway, vec![StubStep::ApiError]));
        let pika = Arc::new(StubEngine::new(EngineId::Pika, vec![StubStep::Clip]));
        let mut registry: HashMap<EngineId, Arc<dyn EngineAdapter>> = HashMap::new();
        registry.insert(EngineId::Runway, runway);
        registry.insert(EngineId::Pika, pika);

        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(registry, local, Arc::new(AcceptAll));

        let results = manager
            .render_all(&graph(1), dir.path(), &options(), None, never_cancelled())
            .await;

        let result = &results[0];
        assert!(result.success);
        assert_eq!(result.engine_used, Some(EngineId::Pika));
        assert!(result.fallback_used);
        assert_eq!(result.fallback_chain, vec![EngineId::Runway, EngineId::Pika]);
    }

    #[tokio::test]
    async fn test_moderation_rejection_rephrases_once() {
        let dir = tempdir().unwrap();
        let runway = Arc::new(StubEngine::new(
            EngineId::Runway,
            vec![StubStep::Moderation, StubStep::Clip],
        ));
        let mut registry: HashMap<EngineId, Arc<dyn EngineAdapter>> = HashMap::new();
        registry.insert(EngineId::Runway, runway.clone());

        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(registry, local, Arc::new(AcceptAll));

        let results = manager
            .render_all(&graph(1), dir.path(), &options(), None, never_cancelled())
            .await;

        let result = &results[0];
        assert!(result.success);
        assert_eq!(result.engine_used, Some(EngineId::Runway));
        assert!(!result.fallback_used);

        let prompts = runway.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].to_lowercase().contains("safe content"));
    }

    #[tokio::test]
    async fn test_validation_failure_triggers_fallback() {
        let dir = tempdir().unwrap();
        let runway = Arc::new(StubEngine::new(EngineId::Runway, vec![StubStep::Clip]));
        let mut registry: HashMap<EngineId, Arc<dyn EngineAdapter>> = HashMap::new();
        registry.insert(EngineId::Runway, runway);

        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(registry, local, Arc::new(RejectAll));

        let results = manager
            .render_all(&graph(1), dir.path(), &options(), None, never_cancelled())
            .await;

        let result = &results[0];
        assert!(result.success);
        assert_eq!(result.engine_used, Some(EngineId::Local));
        assert!(result.fallback_used);
        assert!(result.fallback_chain.contains(&EngineId::Runway));
        assert_eq!(*result.fallback_chain.last().unwrap(), EngineId::Local);
    }

    #[tokio::test]
    async fn test_one_scene_failure_does_not_poison_the_batch() {
        let dir = tempdir().unwrap();
        // Local fails outright; every scene reports failure individually
        // rather than the batch erroring.
        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::ApiError]));
        let manager = manager_with(HashMap::new(), local, Arc::new(AcceptAll));

        let results = manager
            .render_all(&graph(2), dir.path(), &options(), None, never_cancelled())
            .await;
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(!result.success);
            assert!(result.error.is_some());
        }
    }

    #[tokio::test]
    async fn test_progress_channel_receives_every_scene() {
        let dir = tempdir().unwrap();
        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(HashMap::new(), local, Arc::new(AcceptAll));

        let (tx, mut rx) = mpsc::channel(16);
        let results = manager
            .render_all(&graph(3), dir.path(), &options(), Some(tx), never_cancelled())
            .await;
        assert_eq!(results.len(), 3);

        let mut seen = Vec::new();
        while let Ok(result) = rx.try_recv() {
            seen.push(result.scene_id);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cancellation_short_circuits() {
        let dir = tempdir().unwrap();
        let local = Arc::new(StubEngine::new(EngineId::Local, vec![StubStep::Clip]));
        let manager = manager_with(HashMap::new(), local, Arc::new(AcceptAll));

        let (tx, rx) = watch::channel(true);
        let results = manager
            .render_all(&graph(2), dir.path(), &options(), None, rx)
            .await;
        drop(tx);

        for result in &results {
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some("cancelled"));
        }
    }
}
