//! Runway video generation client.
//!
//! Submit → poll → download against Runway's task API. All failure modes
//! (HTTP errors, moderation rejections, rate limits, timeouts) materialize
//! as [`EngineFailure`] values.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use rforge_models::{EngineId, EngineSettings, RenderConfig};

use crate::adapter::{download_to, EngineAdapter, EngineFailure, GeneratedClip, GenerateRequest};

const API_BASE: &str = "https://api.dev.runwayml.com/v1";
const API_VERSION: &str = "2024-11-06";
const ENV_KEY: &str = "RUNWAY_API_KEY";

/// Runway Gen-3 adapter.
pub struct RunwayEngine {
    api_key: String,
    base_url: String,
    settings: EngineSettings,
    poll_interval: Duration,
    client: reqwest::Client,
}

impl RunwayEngine {
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
        Self::new(config.engines.runway.clone())
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
            .post(format!("{}/image_to_video", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
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
            .ok_or_else(|| EngineFailure::Api("submit response missing task id".to_string()))
    }

    async fn poll(&self, task_id: &str, request: &GenerateRequest) -> Result<String, EngineFailure> {
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
                .get(format!("{}/tasks/{task_id}", self.base_url))
                .bearer_auth(&self.api_key)
                .header("X-Runway-Version", API_VERSION)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(task_id, error = %e, "runway poll request failed");
                    continue;
                }
            };

            if response.status().as_u16() == 429 {
                // Transient rate limit during polling: back off and retry.
                tokio::time::sleep(self.poll_interval.max(Duration::from_secs(10)).min(
                    deadline.saturating_duration_since(Instant::now()),
                ))
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

            match body["status"].as_str().unwrap_or_default() {
                "SUCCEEDED" => {
                    return body["output"]
                        .as_array()
                        .and_then(|a| a.first())
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            EngineFailure::Api("task succeeded without output URL".to_string())
                        });
                }
                "FAILED" => {
                    let failure = body["failure"].as_str().unwrap_or("unknown failure");
                    if failure.to_lowercase().contains("moderation") {
                        return Err(EngineFailure::ModerationRejection(failure.to_string()));
                    }
                    return Err(EngineFailure::Api(format!("task failed: {failure}")));
                }
                _ => {}
            }
        }
    }
}

#[async_trait]
impl EngineAdapter for RunwayEngine {
    fn id(&self) -> EngineId {
        EngineId::Runway
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
            "promptText": request.prompt,
            "model": "gen3a_turbo",
            "duration": clip_duration.round() as u64,
            "ratio": "9:16",
        });
        if let Some(seed) = request.seed {
            payload["seed"] = json!(seed);
        }
        if let Some(image) = &request.image_path {
            if image.exists() {
                payload["promptImage"] = json!(format!("file://{}", image.display()));
            }
        }

        let task_id = self.submit(&payload).await?;
        info!(task_id = %task_id, scene_id = request.scene_id, "runway generation submitted");

        let clip_url = self.poll(&task_id, request).await?;

        let clip_path = request.output_dir.join(format!(
            "runway_{task_id}_{}.mp4",
            &Uuid::new_v4().simple().to_string()[..6]
        ));
        download_to(&self.client, &clip_url, &clip_path).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(task_id = %task_id, elapsed_ms, "runway generation complete");

        Ok(GeneratedClip {
            clip_path,
            clip_url: Some(clip_url),
            generation_id: Some(task_id),
            engine: EngineId::Runway,
            elapsed_ms,
        })
    }

    async fn health_check(&self) -> bool {
        if self.api_key.is_empty() || !self.settings.enabled {
            return false;
        }
        match self
            .client
            .get(format!("{}/tasks", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
            .send()
            .await
        {
            // 401 still proves reachability with a configured key.
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
