//! Scene record repository.
//!
//! Scene records are grouped per job (`scenes/{job_id}/{scene_id}.json`);
//! the Engine Manager owns them while their status is `RENDERING`.

use chrono::Utc;
use tracing::info;

use rforge_models::{JobId, SceneRecord, SceneStatus};

use crate::docs::DocumentStore;
use crate::error::{StateError, StateResult};

/// Optional fields applied alongside a scene transition.
#[derive(Debug, Clone, Default)]
pub struct SceneUpdate {
    pub engine_used: Option<String>,
    pub asset_path: Option<String>,
    pub fallback_used: Option<bool>,
    pub render_duration_ms: Option<u64>,
    pub error_message: Option<String>,
}

/// Repository over durable [`SceneRecord`] documents.
#[derive(Debug, Clone)]
pub struct SceneRepository {
    store: DocumentStore,
}

impl SceneRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    fn collection(job_id: &JobId) -> String {
        format!("scenes/{job_id}")
    }

    /// Persist records for every scene of a job.
    pub async fn create_all(&self, records: &[SceneRecord]) -> StateResult<()> {
        for record in records {
            self.store
                .put(
                    &Self::collection(&record.job_id),
                    &record.scene_id.to_string(),
                    record,
                )
                .await?;
        }
        Ok(())
    }

    /// Load one scene record.
    pub async fn get(&self, job_id: &JobId, scene_id: u32) -> StateResult<SceneRecord> {
        self.store
            .get(&Self::collection(job_id), &scene_id.to_string())
            .await?
            .ok_or_else(|| StateError::SceneNotFound {
                job_id: job_id.to_string(),
                scene_id,
            })
    }

    /// All scene records for a job, ordered by index.
    pub async fn list_for_job(&self, job_id: &JobId) -> StateResult<Vec<SceneRecord>> {
        let mut scenes: Vec<SceneRecord> = self.store.list(&Self::collection(job_id)).await?;
        scenes.sort_by_key(|s| s.index);
        Ok(scenes)
    }

    /// Scenes not yet complete (`DONE`/`FALLBACK`), for resume dispatch.
    pub async fn incomplete_for_job(&self, job_id: &JobId) -> StateResult<Vec<SceneRecord>> {
        let scenes = self.list_for_job(job_id).await?;
        Ok(scenes
            .into_iter()
            .filter(|s| !s.status.is_complete())
            .collect())
    }

    /// Whether every scene of a job completed (possibly via fallback).
    pub async fn all_complete(&self, job_id: &JobId) -> StateResult<bool> {
        let scenes = self.list_for_job(job_id).await?;
        Ok(!scenes.is_empty() && scenes.iter().all(|s| s.status.is_complete()))
    }

    /// Transition one scene's status, applying field updates.
    pub async fn transition(
        &self,
        job_id: &JobId,
        scene_id: u32,
        new_status: SceneStatus,
        update: SceneUpdate,
    ) -> StateResult<SceneRecord> {
        let mut scene = self.get(job_id, scene_id).await?;

        scene.status = new_status;
        scene.updated_at = Utc::now();
        if let Some(engine) = update.engine_used {
            scene.engine_used = Some(engine);
        }
        if let Some(path) = update.asset_path {
            scene.asset_path = Some(path);
        }
        if let Some(flag) = update.fallback_used {
            scene.fallback_used = flag;
        }
        if let Some(ms) = update.render_duration_ms {
            scene.render_duration_ms = Some(ms);
        }
        if let Some(error) = update.error_message {
            scene.error_message = Some(error);
        }

        self.store
            .put(&Self::collection(job_id), &scene_id.to_string(), &scene)
            .await?;
        info!(job_id = %job_id, scene_id, new = %new_status, "scene transition");
        Ok(scene)
    }

    /// Fraction of completed scenes in [0, 1].
    pub async fn completion_ratio(&self, job_id: &JobId) -> StateResult<f32> {
        let scenes = self.list_for_job(job_id).await?;
        if scenes.is_empty() {
            return Ok(0.0);
        }
        let done = scenes.iter().filter(|s| s.status.is_complete()).count();
        Ok(done as f32 / scenes.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::MediaType;
    use tempfile::tempdir;

    async fn repo() -> (tempfile::TempDir, SceneRepository) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        (dir, SceneRepository::new(store))
    }

    fn records(job_id: &JobId, n: u32) -> Vec<SceneRecord> {
        (0..n)
            .map(|i| {
                SceneRecord::new(
                    job_id.clone(),
                    i + 1,
                    i,
                    format!("scene {}", i + 1),
                    5_000,
                    MediaType::Video,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_list_is_index_ordered() {
        let (_dir, repo) = repo().await;
        let job_id = JobId::new();
        let mut recs = records(&job_id, 3);
        recs.reverse();
        repo.create_all(&recs).await.unwrap();

        let listed = repo.list_for_job(&job_id).await.unwrap();
        let indices: Vec<u32> = listed.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_incomplete_excludes_done_and_fallback() {
        let (_dir, repo) = repo().await;
        let job_id = JobId::new();
        repo.create_all(&records(&job_id, 3)).await.unwrap();

        repo.transition(&job_id, 1, SceneStatus::Done, SceneUpdate::default())
            .await
            .unwrap();
        repo.transition(
            &job_id,
            2,
            SceneStatus::Fallback,
            SceneUpdate {
                fallback_used: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let incomplete = repo.incomplete_for_job(&job_id).await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].scene_id, 3);
        assert!(!repo.all_complete(&job_id).await.unwrap());

        repo.transition(&job_id, 3, SceneStatus::Done, SceneUpdate::default())
            .await
            .unwrap();
        assert!(repo.all_complete(&job_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_transition_records_engine_and_timing() {
        let (_dir, repo) = repo().await;
        let job_id = JobId::new();
        repo.create_all(&records(&job_id, 1)).await.unwrap();

        let scene = repo
            .transition(
                &job_id,
                1,
                SceneStatus::Done,
                SceneUpdate {
                    engine_used: Some("runway".into()),
                    asset_path: Some("jobs/x/scenes/scene_1.mp4".into()),
                    render_duration_ms: Some(4_200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(scene.engine_used.as_deref(), Some("runway"));
        assert_eq!(scene.render_duration_ms, Some(4_200));
    }

    #[tokio::test]
    async fn test_missing_scene_errors() {
        let (_dir, repo) = repo().await;
        let err = repo.get(&JobId::from_string("j"), 9).await.unwrap_err();
        assert!(matches!(err, StateError::SceneNotFound { scene_id: 9, .. }));
    }
}
