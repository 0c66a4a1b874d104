//! Job record repository.

use chrono::Utc;
use tracing::info;

use rforge_models::{JobId, JobRecord, JobStatus};

use crate::docs::DocumentStore;
use crate::error::{StateError, StateResult};

const COLLECTION: &str = "jobs";

/// Optional fields applied alongside a job transition.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub progress_pct: Option<f32>,
    pub output_uri: Option<String>,
    pub thumbnail_uri: Option<String>,
    pub metadata_uri: Option<String>,
    pub fallback_used: Option<bool>,
    pub fallback_reason: Option<String>,
    pub error: Option<String>,
}

/// Repository over durable [`JobRecord`] documents.
#[derive(Debug, Clone)]
pub struct JobRepository {
    store: DocumentStore,
}

impl JobRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Persist a new job record.
    pub async fn create(&self, job: &JobRecord) -> StateResult<()> {
        self.store.put(COLLECTION, job.id.as_str(), job).await
    }

    /// Load a job, failing if absent.
    pub async fn get(&self, id: &JobId) -> StateResult<JobRecord> {
        self.store
            .get(COLLECTION, id.as_str())
            .await?
            .ok_or_else(|| StateError::JobNotFound(id.to_string()))
    }

    /// Load a job if present.
    pub async fn try_get(&self, id: &JobId) -> StateResult<Option<JobRecord>> {
        self.store.get(COLLECTION, id.as_str()).await
    }

    /// Transition a job's status, applying any extra field updates.
    ///
    /// The transition must respect the monotonic lifecycle; progress never
    /// decreases within a run, so resumption cannot move it backwards.
    pub async fn transition(
        &self,
        id: &JobId,
        new_status: JobStatus,
        update: JobUpdate,
    ) -> StateResult<JobRecord> {
        let mut job = self.get(id).await?;

        if !job.status.can_transition_to(new_status) {
            return Err(StateError::IllegalTransition {
                job_id: id.to_string(),
                from: job.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let old = job.status;
        job.status = new_status;
        job.updated_at = Utc::now();

        if let Some(pct) = update.progress_pct {
            job.progress_pct = job.progress_pct.max(pct.clamp(0.0, 100.0));
        }
        if let Some(uri) = update.output_uri {
            job.output_uri = Some(uri);
        }
        if let Some(uri) = update.thumbnail_uri {
            job.thumbnail_uri = Some(uri);
        }
        if let Some(uri) = update.metadata_uri {
            job.metadata_uri = Some(uri);
        }
        if let Some(flag) = update.fallback_used {
            job.fallback_used = flag;
        }
        if let Some(reason) = update.fallback_reason {
            job.fallback_reason = Some(reason);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }

        self.store.put(COLLECTION, id.as_str(), &job).await?;
        info!(job_id = %id, old = %old, new = %new_status, "job transition");
        Ok(job)
    }

    /// Update progress only, without a status change.
    pub async fn set_progress(&self, id: &JobId, pct: f32) -> StateResult<JobRecord> {
        let mut job = self.get(id).await?;
        job.progress_pct = job.progress_pct.max(pct.clamp(0.0, 100.0));
        job.updated_at = Utc::now();
        self.store.put(COLLECTION, id.as_str(), &job).await?;
        Ok(job)
    }

    /// Persist the canonical scene graph JSON on the record.
    pub async fn save_scene_graph(&self, id: &JobId, json: String) -> StateResult<JobRecord> {
        let mut job = self.get(id).await?;
        job.scene_graph_json = Some(json);
        job.updated_at = Utc::now();
        self.store.put(COLLECTION, id.as_str(), &job).await?;
        Ok(job)
    }

    /// Persist the derived timeline JSON on the record.
    pub async fn save_timeline(&self, id: &JobId, json: String) -> StateResult<JobRecord> {
        let mut job = self.get(id).await?;
        job.timeline_json = Some(json);
        job.updated_at = Utc::now();
        self.store.put(COLLECTION, id.as_str(), &job).await?;
        Ok(job)
    }

    /// Jobs in any non-terminal status, for the resume scan.
    pub async fn list_non_terminal(&self) -> StateResult<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self
            .store
            .list(COLLECTION)
            .await?
            .into_iter()
            .filter(|j: &JobRecord| !j.status.is_terminal())
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::RenderRequest;
    use tempfile::tempdir;

    async fn repo() -> (tempfile::TempDir, JobRepository) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).await.unwrap();
        (dir, JobRepository::new(store))
    }

    fn job() -> JobRecord {
        JobRecord::new(&RenderRequest::new("product_hero_clean"))
    }

    #[tokio::test]
    async fn test_create_and_transition() {
        let (_dir, repo) = repo().await;
        let record = job();
        repo.create(&record).await.unwrap();

        let updated = repo
            .transition(&record.id, JobStatus::PlanningScenes, JobUpdate::default())
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::PlanningScenes);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let (_dir, repo) = repo().await;
        let record = job();
        repo.create(&record).await.unwrap();
        repo.transition(&record.id, JobStatus::RenderingScenes, JobUpdate::default())
            .await
            .unwrap();

        let err = repo
            .transition(&record.id, JobStatus::Queued, JobUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let (_dir, repo) = repo().await;
        let record = job();
        repo.create(&record).await.unwrap();

        repo.set_progress(&record.id, 50.0).await.unwrap();
        let after = repo.set_progress(&record.id, 25.0).await.unwrap();
        assert_eq!(after.progress_pct, 50.0);
    }

    #[tokio::test]
    async fn test_non_terminal_scan_excludes_done() {
        let (_dir, repo) = repo().await;
        let a = job();
        let b = job();
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        for status in [
            JobStatus::PlanningScenes,
            JobStatus::BuildingTimeline,
            JobStatus::RenderingScenes,
            JobStatus::Composing,
            JobStatus::AudioAssembly,
            JobStatus::Finalizing,
            JobStatus::Done,
        ] {
            repo.transition(&a.id, status, JobUpdate::default()).await.unwrap();
        }

        let pending = repo.list_non_terminal().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[tokio::test]
    async fn test_missing_job_errors() {
        let (_dir, repo) = repo().await;
        let err = repo.get(&JobId::from_string("nope")).await.unwrap_err();
        assert!(matches!(err, StateError::JobNotFound(_)));
    }
}
