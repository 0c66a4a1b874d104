//! Deterministic local renderer — the terminal fallback.
//!
//! Produces a valid 9:16 clip at the requested duration without any
//! external call: a Ken-Burns loop when a scene image is available, or a
//! colored card with the scene text drawn centered.

use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

use rforge_models::EngineId;
use rforge_media::{check_ffmpeg, color_card, ken_burns, KenBurnsEffect};

use crate::adapter::{EngineAdapter, EngineFailure, GeneratedClip, GenerateRequest};

/// Background used when no image is available.
const DEFAULT_BACKGROUND: &str = "0x14213D";

/// Local ffmpeg-backed renderer.
pub struct LocalRenderer {
    width: u32,
    height: u32,
    fps: u32,
    background: String,
}

impl Default for LocalRenderer {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            background: DEFAULT_BACKGROUND.to_string(),
        }
    }
}

impl LocalRenderer {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            background: DEFAULT_BACKGROUND.to_string(),
        }
    }
}

#[async_trait]
impl EngineAdapter for LocalRenderer {
    fn id(&self) -> EngineId {
        EngineId::Local
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedClip, EngineFailure> {
        let started = Instant::now();

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| EngineFailure::Api(format!("create output dir: {e}")))?;
        let clip_path = request
            .output_dir
            .join(format!("scene_{}.mp4", request.scene_id));

        let usable_image = request
            .image_path
            .as_ref()
            .filter(|p| p.exists());

        match usable_image {
            Some(image) => {
                let effect = KenBurnsEffect::for_scene(request.scene_id);
                ken_burns(
                    image,
                    &clip_path,
                    effect,
                    request.duration_seconds,
                    self.width,
                    self.height,
                    self.fps,
                )
                .await
                .map_err(|e| EngineFailure::Api(format!("ken burns render: {e}")))?;
            }
            None => {
                let title = format!("Scene {}", request.scene_id);
                let body: String = request.prompt.chars().take(80).collect();
                color_card(
                    &clip_path,
                    &title,
                    Some(&body),
                    &self.background,
                    request.duration_seconds,
                    self.width,
                    self.height,
                    self.fps,
                )
                .await
                .map_err(|e| EngineFailure::Api(format!("color card render: {e}")))?;
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            scene_id = request.scene_id,
            with_image = usable_image.is_some(),
            elapsed_ms,
            "local render complete"
        );

        Ok(GeneratedClip {
            clip_path,
            clip_url: None,
            generation_id: None,
            engine: EngineId::Local,
            elapsed_ms,
        })
    }

    async fn health_check(&self) -> bool {
        check_ffmpeg().is_ok()
    }

    fn max_duration(&self) -> f64 {
        60.0
    }

    fn supports_image_input(&self) -> bool {
        true
    }
}
