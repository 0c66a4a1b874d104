//! State store error types.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("scene {scene_id} not found for job {job_id}")]
    SceneNotFound { job_id: String, scene_id: u32 },

    #[error("illegal job transition for {job_id}: {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: String,
        to: String,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
