//! Worker configuration.
//!
//! Runtime knobs come from environment variables; the render configuration
//! tree layers an optional file under `RFORGE_CONFIG` with `RFORGE__`
//! prefixed environment overrides on top of the built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use rforge_models::RenderConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker runtime configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Blob storage root.
    pub storage_root: PathBuf,
    /// State store root.
    pub state_root: PathBuf,
    /// Redis URL; None selects the in-memory queue (local mode).
    pub redis_url: Option<String>,
    /// Scene fan-out width within a job.
    pub max_concurrent_scenes: usize,
    /// Blocking dequeue timeout.
    pub dequeue_timeout: Duration,
    /// Render configuration tree.
    pub render: RenderConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("storage"),
            state_root: PathBuf::from("state"),
            redis_url: None,
            max_concurrent_scenes: 3,
            dequeue_timeout: Duration::from_secs(3),
            render: RenderConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Ok(Self {
            storage_root: std::env::var("RFORGE_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("storage")),
            state_root: std::env::var("RFORGE_STATE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("state")),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            max_concurrent_scenes: std::env::var("RFORGE_MAX_CONCURRENT_SCENES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            dequeue_timeout: Duration::from_secs(
                std::env::var("RFORGE_DEQUEUE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
            ),
            render: load_render_config()?,
        })
    }
}

/// Load the render configuration: defaults, then an optional file, then
/// environment overrides.
fn load_render_config() -> WorkerResult<RenderConfig> {
    let mut builder = config::Config::builder();

    if let Ok(path) = std::env::var("RFORGE_CONFIG") {
        builder = builder.add_source(config::File::with_name(&path).required(false));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("RFORGE")
            .separator("__")
            .try_parsing(true),
    );

    let layered = builder
        .build()
        .map_err(|e| WorkerError::config(format!("config load: {e}")))?;

    // An empty source tree deserializes to the full default config.
    match layered.try_deserialize::<RenderConfig>() {
        Ok(render) => Ok(render),
        Err(_) => Ok(RenderConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_scenes, 3);
        assert_eq!(config.dequeue_timeout, Duration::from_secs(3));
        assert!(config.redis_url.is_none());
        assert_eq!(config.render.output.width, 1080);
    }
}
