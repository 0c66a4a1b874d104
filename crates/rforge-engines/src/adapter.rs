//! The engine capability: every provider — external or local — implements
//! [`EngineAdapter`] and materializes all failure modes as
//! [`EngineFailure`] values, never panics or transport errors.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::watch;

use rforge_models::EngineId;

/// Style hints forwarded to providers alongside the prompt.
#[derive(Debug, Clone, Default)]
pub struct StyleHints {
    pub mood: Option<String>,
    pub camera_motion: Option<String>,
    pub lighting: Option<String>,
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub scene_id: u32,
    pub prompt: String,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    /// Conditioning image, for providers that support image input.
    pub image_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub style_hints: StyleHints,
    /// Directory the produced clip is downloaded into.
    pub output_dir: PathBuf,
    /// Cancellation flag, observed at polling suspension points.
    pub cancel: watch::Receiver<bool>,
}

impl GenerateRequest {
    pub fn new(
        scene_id: u32,
        prompt: impl Into<String>,
        duration_seconds: f64,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self {
            scene_id,
            prompt: prompt.into(),
            duration_seconds,
            width: 1080,
            height: 1920,
            image_path: None,
            seed: None,
            style_hints: StyleHints::default(),
            output_dir: output_dir.into(),
            cancel,
        }
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// A successfully produced clip.
#[derive(Debug, Clone)]
pub struct GeneratedClip {
    pub clip_path: PathBuf,
    /// Remote URL the clip was downloaded from, when applicable.
    pub clip_url: Option<String>,
    /// Provider-side generation id.
    pub generation_id: Option<String>,
    pub engine: EngineId,
    pub elapsed_ms: u64,
}

/// Failure modes of a generation attempt. Each triggers the next fallback
/// level; none is fatal to a job.
#[derive(Debug, Clone, Error)]
pub enum EngineFailure {
    #[error("API key not configured ({0})")]
    MissingApiKey(&'static str),

    #[error("content moderation rejection: {0}")]
    ModerationRejection(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,

    #[error("provider API error: {0}")]
    Api(String),
}

impl EngineFailure {
    /// Stable error code for records and logs.
    pub fn code(&self) -> &'static str {
        match self {
            EngineFailure::MissingApiKey(_) => "missing_api_key",
            EngineFailure::ModerationRejection(_) => "moderation_rejection",
            EngineFailure::RateLimited => "rate_limited",
            EngineFailure::Timeout(_) => "timeout",
            EngineFailure::Cancelled => "cancelled",
            EngineFailure::Api(_) => "api_error",
        }
    }

    pub fn is_moderation(&self) -> bool {
        matches!(self, EngineFailure::ModerationRejection(_))
    }
}

/// Capability implemented by every video generation engine.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Unique engine identifier.
    fn id(&self) -> EngineId;

    /// Engine name for logs and records.
    fn name(&self) -> &'static str {
        self.id().as_str()
    }

    /// Whether credentials for this engine are configured.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Submit a generation and return the downloaded clip.
    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedClip, EngineFailure>;

    /// Whether the engine API is reachable and keys look valid.
    async fn health_check(&self) -> bool;

    /// Maximum clip duration this engine can produce, in seconds.
    fn max_duration(&self) -> f64;

    /// Whether the engine supports image conditioning.
    fn supports_image_input(&self) -> bool;
}

/// Download a produced clip to a local file.
pub(crate) async fn download_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), EngineFailure> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineFailure::Api(format!("create output dir: {e}")))?;
    }
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| EngineFailure::Api(format!("download failed: {e}")))?;
    if !response.status().is_success() {
        return Err(EngineFailure::Api(format!(
            "download failed with status {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| EngineFailure::Api(format!("download read failed: {e}")))?;
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| EngineFailure::Api(format!("write clip: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        assert_eq!(EngineFailure::RateLimited.code(), "rate_limited");
        assert_eq!(EngineFailure::Timeout(60).code(), "timeout");
        assert_eq!(
            EngineFailure::ModerationRejection("x".into()).code(),
            "moderation_rejection"
        );
        assert!(EngineFailure::ModerationRejection("x".into()).is_moderation());
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerateRequest::new(1, "a prompt", 5.0, "/tmp/out");
        assert_eq!(req.width, 1080);
        assert_eq!(req.height, 1920);
        assert!(!req.is_cancelled());
    }
}
