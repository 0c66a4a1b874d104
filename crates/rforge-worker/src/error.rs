//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("planning failed: {0}")]
    Planning(#[from] rforge_models::PlanningError),

    #[error("timeline build failed: {0}")]
    Timeline(#[from] rforge_models::TimelineBuildError),

    #[error("scene graph error: {0}")]
    Graph(#[from] rforge_models::GraphError),

    #[error("timeline document error: {0}")]
    TimelineDoc(#[from] rforge_models::TimelineError),

    #[error("state error: {0}")]
    State(#[from] rforge_state::StateError),

    #[error("storage error: {0}")]
    Storage(#[from] rforge_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] rforge_queue::QueueError),

    #[error("media error: {0}")]
    Media(#[from] rforge_media::MediaError),

    #[error("audio error: {0}")]
    Audio(#[from] rforge_audio::AudioError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Transient IO against the queue or stores is retried at the outer
    /// loop; everything else fails the current step.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WorkerError::Queue(_) | WorkerError::Storage(_) | WorkerError::Io(_)
        )
    }
}
