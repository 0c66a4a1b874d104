//! Luma Dream Machine video generation client.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use rforge_models::{EngineId, EngineSettings, RenderConfig};

use crate::adapter::{download_to, EngineAdapter, EngineFailure, GeneratedClip, GenerateRequest};

const API_BASE: &str = "https://api.lumalabs.ai/dream-machine/v1";
const ENV_KEY: &str = "LUMA_API_KEY";

/// Luma adapter, tuned for physics/3D/product-showcase generations.
pub struct LumaEngine {
    api_key: String,
    base_url: String,
    settings: EngineSettings,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl LumaEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            api_key: std::env::var(ENV_KEY).unwrap_or_default(),
            base_url: API_BASE.to_string(),
            settings,
            poll_interval: Duration::from_secs(5),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.engines.luma.clone())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn submit(&self, payload: &Value) -> Result<String, EngineFailure> {
        let response = self
            .client
            .post(format!("{}/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| EngineFailure::Api(format!("submit failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EngineFailure::RateLimited);
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let lower = body.to_lowercase();
            if lower.contains("moderation") || lower.contains("content policy") {
                return Err(EngineFailure::ModerationRejection(body));
            }
            return Err(EngineFailure::Api(format!("submit rejected ({status}): {body}")));
        }
        if !status.is_success() {
            return Err(EngineFailure::Api(format!("submit failed with status {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineFailure::Api(format!("submit response parse: {e}")))?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineFailure::Api("submit response missing generation id".to_string()))
    }

    async fn poll(
        &self,
        generation_id: &str,
        request: &GenerateRequest,
    ) -> Result<String, EngineFailure> {
        let deadline = Instant::now() + Duration::from_secs(self.settings.timeout_seconds);

        loop {
            if request.is_cancelled() {
                return Err(EngineFailure::Cancelled);
            }
            tokio::time::sleep(self.poll_interval).await;
            if Instant::now() >= deadline {
                return Err(EngineFailure::Timeout(self.settings.timeout_seconds));
            }

            let response = match self
                .client
                .get(format!("{}/generations/{generation_id}", self.base_url))
                .bearer_auth(&self.api_key)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(generation_id, error = %e, "luma poll request failed");
                    continue;
                }
            };

            if response.status().as_u16() == 429 {
                tokio::time::sleep(
                    self.poll_interval
                        .max(Duration::from_secs(9))
                        .min(deadline.saturating_duration_since(Instant::now())),
                )
                .await;
                continue;
            }
            if !response.status().is_success() {
                continue;
            }

            let body: Value = match response.json().await {
                Ok(body) => body,
                Err(_) => continue,
            };

            match body["state"].as_str().unwrap_or_default() {
                "completed" => {
                    return body["assets"]["video"]
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            EngineFailure::Api("generation completed without video asset".to_string())
                        });
                }
                "failed" => {
                    let reason = body["failure_reason"].as_str().unwrap_or("unknown failure");
                    if reason.to_lowercase().contains("moderation") {
                        return Err(EngineFailure::ModerationRejection(reason.to_string()));
                    }
                    return Err(EngineFailure::Api(format!("generation failed: {reason}")));
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl EngineAdapter for LumaEngine {
    fn id(&self) -> EngineId {
        EngineId::Luma
    }

    fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedClip, EngineFailure> {
        let started = Instant::now();

        if self.api_key.is_empty() {
            return Err(EngineFailure::MissingApiKey(ENV_KEY));
        }

        let clip_duration = request
            .duration_seconds
            .min(self.settings.max_clip_duration_seconds);

        let mut payload = json!({
            "prompt": request.prompt,
            "aspect_ratio": "9:16",
            "duration": format!("{}s", clip_duration.round() as u64),
        });
        if let Some(image) = &request.image_path {
            if image.exists() {
                payload["keyframes"] = json!({
                    "frame0": {"type": "image", "url": format!("file://{}", image.display())}
                });
            }
        }

        let generation_id = self.submit(&payload).await?;
        info!(generation_id = %generation_id, scene_id = request.scene_id, "luma generation submitted");

        let clip_url = self.poll(&generation_id, request).await?;

        let clip_path = request.output_dir.join(format!(
            "luma_{generation_id}_{}.mp4",
            &Uuid::new_v4().simple().to_string()[..6]
        ));
        download_to(&self.client, &clip_url, &clip_path).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(generation_id = %generation_id, elapsed_ms, "luma generation complete");

        Ok(GeneratedClip {
            clip_path,
            clip_url: Some(clip_url),
            generation_id: Some(generation_id),
            engine: EngineId::Luma,
            elapsed_ms,
        })
    }

    async fn health_check(&self) -> bool {
        if self.api_key.is_empty() || !self.settings.enabled {
            return false;
        }
        match self
            .client
            .get(format!("{}/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => matches!(response.status().as_u16(), 200 | 401),
            Err(_) => false,
        }
    }

    fn max_duration(&self) -> f64 {
        self.settings.max_clip_duration_seconds
    }

    fn supports_image_input(&self) -> bool {
        true
    }
}
