//! Job and Scene durable records and their lifecycle enums.
//!
//! A job moves through a fixed, monotonic status sequence; `FAILED` is
//! reachable from any non-terminal state and is absorbing. Scene records
//! track per-scene render outcomes, including which engine produced the
//! clip and whether the fallback chain was used.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::scene_graph::MediaType;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[default]
    Queued,
    PlanningScenes,
    BuildingTimeline,
    RenderingScenes,
    Composing,
    AudioAssembly,
    Finalizing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::PlanningScenes => "PLANNING_SCENES",
            JobStatus::BuildingTimeline => "BUILDING_TIMELINE",
            JobStatus::RenderingScenes => "RENDERING_SCENES",
            JobStatus::Composing => "COMPOSING",
            JobStatus::AudioAssembly => "AUDIO_ASSEMBLY",
            JobStatus::Finalizing => "FINALIZING",
            JobStatus::Done => "DONE",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::PlanningScenes => 1,
            JobStatus::BuildingTimeline => 2,
            JobStatus::RenderingScenes => 3,
            JobStatus::Composing => 4,
            JobStatus::AudioAssembly => 5,
            JobStatus::Finalizing => 6,
            JobStatus::Done => 7,
            JobStatus::Failed => 8,
        }
    }

    /// Whether a transition to `next` respects the monotonic lifecycle.
    ///
    /// Re-entering the current state is allowed (progress updates); `FAILED`
    /// is reachable from any non-terminal state and absorbing.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Failed {
            return true;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-scene render status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneStatus {
    #[default]
    Pending,
    Rendering,
    Done,
    Fallback,
    Failed,
}

impl SceneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneStatus::Pending => "PENDING",
            SceneStatus::Rendering => "RENDERING",
            SceneStatus::Done => "DONE",
            SceneStatus::Fallback => "FALLBACK",
            SceneStatus::Failed => "FAILED",
        }
    }

    /// `FALLBACK` is a terminal success: the chain produced a usable clip.
    pub fn is_complete(&self) -> bool {
        matches!(self, SceneStatus::Done | SceneStatus::Fallback)
    }
}

impl fmt::Display for SceneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The declarative render request persisted with the job at acceptance time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub prompt: String,
    pub preset_id: String,
    #[serde(default = "default_brand_safe")]
    pub brand_safe: bool,
    #[serde(default = "default_target_duration")]
    pub target_duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_uri: Option<String>,
}

fn default_brand_safe() -> bool {
    true
}

fn default_target_duration() -> u32 {
    15
}

impl RenderRequest {
    pub fn new(preset_id: impl Into<String>) -> Self {
        Self {
            prompt: String::new(),
            preset_id: preset_id.into(),
            brand_safe: true,
            target_duration_seconds: 15,
            engine_preference: None,
            image_uris: Vec::new(),
            music_uri: None,
            voice_uri: None,
        }
    }
}

/// Durable record for one render job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    /// Pipeline version; this engine only produces scene-graph (v2) jobs.
    #[serde(default = "default_job_version")]
    pub version: u32,
    #[serde(default)]
    pub status: JobStatus,
    pub preset_id: String,
    #[serde(default = "default_brand_safe")]
    pub brand_safe: bool,
    pub target_duration_seconds: u32,
    #[serde(default)]
    pub progress_pct: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_uri: Option<String>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_graph_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_spec_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_job_version() -> u32 {
    2
}

impl JobRecord {
    /// Create a new queued job from a render request.
    pub fn new(request: &RenderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            version: default_job_version(),
            status: JobStatus::Queued,
            preset_id: request.preset_id.clone(),
            brand_safe: request.brand_safe,
            target_duration_seconds: request.target_duration_seconds,
            progress_pct: 0.0,
            output_uri: None,
            thumbnail_uri: None,
            metadata_uri: None,
            fallback_used: false,
            fallback_reason: None,
            error: None,
            scene_graph_json: None,
            timeline_json: None,
            render_spec_json: serde_json::to_string(request).ok(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Deserialize the persisted render request, if present.
    pub fn render_request(&self) -> Option<RenderRequest> {
        self.render_spec_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }
}

/// Durable record for one scene of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub scene_id: u32,
    pub job_id: JobId,
    pub index: u32,
    pub description: String,
    pub duration_ms: u64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_used: Option<String>,
    #[serde(default)]
    pub status: SceneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_path: Option<String>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SceneRecord {
    /// Create a pending record for a scene of a job.
    pub fn new(
        job_id: JobId,
        scene_id: u32,
        index: u32,
        description: impl Into<String>,
        duration_ms: u64,
        media_type: MediaType,
    ) -> Self {
        let now = Utc::now();
        Self {
            scene_id,
            job_id,
            index,
            description: description.into(),
            duration_ms,
            media_type,
            engine_used: None,
            status: SceneStatus::Pending,
            asset_path: None,
            fallback_used: false,
            render_duration_ms: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sequence_is_monotonic() {
        let order = [
            JobStatus::Queued,
            JobStatus::PlanningScenes,
            JobStatus::BuildingTimeline,
            JobStatus::RenderingScenes,
            JobStatus::Composing,
            JobStatus::AudioAssembly,
            JobStatus::Finalizing,
            JobStatus::Done,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            assert!(!pair[1].can_transition_to(pair[0]), "{} -> {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_failed_reachable_and_absorbing() {
        assert!(JobStatus::RenderingScenes.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_scene_fallback_counts_as_complete() {
        assert!(SceneStatus::Fallback.is_complete());
        assert!(SceneStatus::Done.is_complete());
        assert!(!SceneStatus::Failed.is_complete());
        assert!(!SceneStatus::Rendering.is_complete());
    }

    #[test]
    fn test_job_record_round_trips_request() {
        let mut request = RenderRequest::new("product_hero_clean");
        request.prompt = "Product reveal. Key features.".into();
        request.image_uris = vec!["file:///tmp/p.png".into()];

        let job = JobRecord::new(&request);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.render_request().unwrap(), request);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&JobStatus::PlanningScenes).unwrap();
        assert_eq!(json, "\"PLANNING_SCENES\"");
        let json = serde_json::to_string(&SceneStatus::Fallback).unwrap();
        assert_eq!(json, "\"FALLBACK\"");
    }
}
