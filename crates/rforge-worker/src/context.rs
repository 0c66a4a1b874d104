//! Shared worker context: storage, state, queue and the engine manager.

use std::sync::Arc;
use tracing::info;

use rforge_engines::EngineManager;
use rforge_models::{plan_scenes, JobRecord, PlanInput, RenderRequest};
use rforge_queue::{JobQueue, QueueConfig, QueuedJob};
use rforge_state::{DocumentStore, JobRepository, SceneRepository};
use rforge_storage::{JobKeys, LocalStore};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Everything a job run needs, wired once per process.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub store: LocalStore,
    pub jobs: JobRepository,
    pub scenes: SceneRepository,
    pub queue: JobQueue,
    pub engines: Arc<EngineManager>,
}

impl WorkerContext {
    /// Wire the context from configuration.
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let store = LocalStore::open(&config.storage_root).await?;
        let docs = DocumentStore::open(&config.state_root).await?;
        let jobs = JobRepository::new(docs.clone());
        let scenes = SceneRepository::new(docs);

        let queue = match &config.redis_url {
            Some(url) => JobQueue::redis(QueueConfig {
                redis_url: url.clone(),
                ..QueueConfig::from_env()
            })?,
            None => JobQueue::memory(),
        };

        let render_config = Arc::new(config.render.clone());
        let engines = Arc::new(
            EngineManager::new(render_config).with_max_concurrent(config.max_concurrent_scenes),
        );

        Ok(Self {
            config,
            store,
            jobs,
            scenes,
            queue,
            engines,
        })
    }

    /// Accept a render request: persist the job with its eagerly planned
    /// scene graph, write the canonical planning artifact, and enqueue.
    pub async fn submit_job(&self, request: &RenderRequest) -> WorkerResult<JobRecord> {
        let mut job = JobRecord::new(request);

        let graph = plan_scenes(&PlanInput {
            media_assets: request.image_uris.clone(),
            prompt: request.prompt.clone(),
            preset_id: request.preset_id.clone(),
            brand_safe: request.brand_safe,
            target_duration_seconds: request.target_duration_seconds,
            voiceover_duration_ms: None,
            engine_preference: request.engine_preference.clone(),
        })?;
        let graph_json = graph.to_json()?;

        let keys = JobKeys::new(job.id.as_str());
        self.store
            .save_bytes(&keys.scene_graph(), graph_json.as_bytes())
            .await?;
        job.scene_graph_json = Some(graph_json);

        self.jobs.create(&job).await?;
        self.queue.enqueue(&QueuedJob::new(job.id.as_str())).await?;

        info!(job_id = %job.id, scenes = graph.scenes.len(), "job accepted");
        Ok(job)
    }
}
