//! Scene Graph (schema version 2.0).
//!
//! The Scene Graph is the declarative, hand-editable render plan: an ordered
//! set of scenes with their media sources, captions, styles, overlays and
//! transitions. It carries no timing layout — that is the Timeline's job.
//!
//! Validation happens at construction ([`SceneGraph::new`]) and after
//! deserialization ([`SceneGraph::from_json`]); a graph held by value is
//! assumed valid.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Frozen schema version for serialized scene graphs.
pub const SCENE_GRAPH_VERSION: &str = "2.0";

/// Hard ceiling for the sum of scene durations.
pub const MAX_TOTAL_DURATION_MS: u64 = 60_000;

/// Minimum duration of a single scene.
pub const MIN_SCENE_DURATION_MS: u64 = 1_000;

/// Maximum duration of a single scene.
pub const MAX_SCENE_DURATION_MS: u64 = 60_000;

/// Errors raised while validating a scene graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("scene graph must contain at least one scene")]
    EmptyGraph,

    #[error("scene ids must be unique (duplicate id {0})")]
    DuplicateSceneId(u32),

    #[error("scene {scene_id}: id must be >= 1")]
    InvalidSceneId { scene_id: u32 },

    #[error("scene {scene_id}: description must not be empty")]
    EmptyDescription { scene_id: u32 },

    #[error("scene {scene_id}: duration {duration_ms}ms outside {MIN_SCENE_DURATION_MS}-{MAX_SCENE_DURATION_MS}ms")]
    DurationOutOfRange { scene_id: u32, duration_ms: u64 },

    #[error("total scene duration {total_ms}ms exceeds maximum of {MAX_TOTAL_DURATION_MS}ms")]
    TotalDurationExceeded { total_ms: u64 },

    #[error("scene {scene_id}: media.prompt is required when media.engine is set")]
    MissingPrompt { scene_id: u32 },

    #[error("scene {scene_id}: video media requires at least one of engine, asset, or prompt")]
    MediaUnderspecified { scene_id: u32 },

    #[error("scene {scene_id}: overlay {field} out of range")]
    OverlayOutOfRange { scene_id: u32, field: &'static str },

    #[error("invalid scene graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Kind of primary media backing a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Known generation engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EngineId {
    Runway,
    Pika,
    Luma,
    Local,
}

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Runway => "runway",
            EngineId::Pika => "pika",
            EngineId::Luma => "luma",
            EngineId::Local => "local",
        }
    }

    /// True for engines backed by an external provider API.
    pub fn is_external(&self) -> bool {
        !matches!(self, EngineId::Local)
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "runway" => Ok(EngineId::Runway),
            "pika" => Ok(EngineId::Pika),
            "luma" => Ok(EngineId::Luma),
            "local" => Ok(EngineId::Local),
            _ => Err(()),
        }
    }
}

/// Motion effect applied to image-backed scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisualEffect {
    KenBurnsZoom,
    KenBurnsPan,
    SlowZoomIn,
    SlowZoomOut,
    Static,
}

/// Transition from a scene toward its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Cut,
    #[default]
    Fade,
    FadeBlack,
    SwipeLeft,
    SwipeRight,
}

impl TransitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionType::Cut => "cut",
            TransitionType::Fade => "fade",
            TransitionType::FadeBlack => "fade_black",
            TransitionType::SwipeLeft => "swipe_left",
            TransitionType::SwipeRight => "swipe_right",
        }
    }

    /// Brand-safe mode restricts transitions to the calm subset.
    pub fn is_brand_safe(&self) -> bool {
        matches!(self, TransitionType::Cut | TransitionType::Fade)
    }
}

/// Overlay element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverlayType {
    ProductImage,
    Logo,
    Text,
    Graphic,
}

/// Anchor position for overlays and transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Custom,
}

/// Primary media content for a scene.
///
/// A discriminated union on `type`: image scenes are rendered locally from a
/// still (or a placeholder card), video scenes are generated by an engine or
/// supplied as an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneMedia {
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        effect: Option<VisualEffect>,
    },
    Video {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        engine: Option<EngineId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset: Option<String>,
    },
}

impl SceneMedia {
    pub fn media_type(&self) -> MediaType {
        match self {
            SceneMedia::Image { .. } => MediaType::Image,
            SceneMedia::Video { .. } => MediaType::Video,
        }
    }

    /// The asset reference, if one is attached.
    pub fn asset(&self) -> Option<&str> {
        match self {
            SceneMedia::Image { asset, .. } => asset.as_deref(),
            SceneMedia::Video { asset, .. } => asset.as_deref(),
        }
    }

    /// The generation prompt, for video media.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            SceneMedia::Image { .. } => None,
            SceneMedia::Video { prompt, .. } => prompt.as_deref(),
        }
    }

    /// The explicitly requested engine, for video media.
    pub fn engine(&self) -> Option<EngineId> {
        match self {
            SceneMedia::Image { .. } => None,
            SceneMedia::Video { engine, .. } => *engine,
        }
    }

    fn validate(&self, scene_id: u32) -> Result<(), GraphError> {
        if let SceneMedia::Video {
            engine,
            prompt,
            asset,
        } = self
        {
            if engine.is_some() && prompt.is_none() {
                return Err(GraphError::MissingPrompt { scene_id });
            }
            if engine.is_none() && prompt.is_none() && asset.is_none() {
                return Err(GraphError::MediaUnderspecified { scene_id });
            }
        }
        Ok(())
    }
}

/// Visual style metadata for a scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_motion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
}

impl SceneStyle {
    /// Flatten style fields into a lowercase search string.
    pub fn keywords(&self) -> String {
        [&self.mood, &self.camera_motion, &self.lighting]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Overlay element rendered on top of the primary media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneOverlay {
    #[serde(rename = "type")]
    pub kind: OverlayType,
    pub asset: String,
    #[serde(default)]
    pub position: OverlayPosition,
    #[serde(default = "default_overlay_scale")]
    pub scale: f64,
    #[serde(default = "default_overlay_opacity")]
    pub opacity: f64,
}

fn default_overlay_scale() -> f64 {
    1.0
}

fn default_overlay_opacity() -> f64 {
    1.0
}

impl SceneOverlay {
    fn validate(&self, scene_id: u32) -> Result<(), GraphError> {
        if !(0.01..=2.0).contains(&self.scale) {
            return Err(GraphError::OverlayOutOfRange {
                scene_id,
                field: "scale",
            });
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(GraphError::OverlayOutOfRange {
                scene_id,
                field: "opacity",
            });
        }
        Ok(())
    }
}

/// Global audio configuration: voice script, voice file, background music.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAudio {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<String>,
}

impl GlobalAudio {
    /// Whether any voice source (script or file) is configured.
    pub fn has_voice(&self) -> bool {
        self.voice_script.as_deref().is_some_and(|s| !s.is_empty())
            || self.voice_file.is_some()
    }
}

/// A single scene node in the Scene Graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Unique scene identifier, >= 1.
    pub id: u32,
    pub description: String,
    /// Scene duration in milliseconds.
    pub duration: u64,
    pub media: SceneMedia,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub style: SceneStyle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<SceneOverlay>,
    #[serde(default)]
    pub transition: TransitionType,
}

impl Scene {
    fn validate(&self) -> Result<(), GraphError> {
        if self.id < 1 {
            return Err(GraphError::InvalidSceneId { scene_id: self.id });
        }
        if self.description.trim().is_empty() {
            return Err(GraphError::EmptyDescription { scene_id: self.id });
        }
        if !(MIN_SCENE_DURATION_MS..=MAX_SCENE_DURATION_MS).contains(&self.duration) {
            return Err(GraphError::DurationOutOfRange {
                scene_id: self.id,
                duration_ms: self.duration,
            });
        }
        self.media.validate(self.id)?;
        for overlay in &self.overlays {
            overlay.validate(self.id)?;
        }
        Ok(())
    }
}

/// Top-level Scene Graph document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneGraph {
    #[serde(default = "default_version")]
    pub version: String,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub global_audio: GlobalAudio,
}

fn default_version() -> String {
    SCENE_GRAPH_VERSION.to_string()
}

impl SceneGraph {
    /// Build a validated scene graph.
    pub fn new(scenes: Vec<Scene>, global_audio: GlobalAudio) -> Result<Self, GraphError> {
        let graph = Self {
            version: default_version(),
            scenes,
            global_audio,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Parse and validate a serialized scene graph.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let graph: SceneGraph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Serialize to the canonical JSON document.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sum of scene durations in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.scenes.iter().map(|s| s.duration).sum()
    }

    /// Check all graph invariants.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.scenes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        let mut seen = std::collections::HashSet::new();
        for scene in &self.scenes {
            scene.validate()?;
            if !seen.insert(scene.id) {
                return Err(GraphError::DuplicateSceneId(scene.id));
            }
        }

        let total = self.total_duration_ms();
        if total > MAX_TOTAL_DURATION_MS {
            return Err(GraphError::TotalDurationExceeded { total_ms: total });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: u32, duration: u64) -> Scene {
        Scene {
            id,
            description: format!("Scene {id}"),
            duration,
            media: SceneMedia::Video {
                engine: None,
                prompt: Some("a product on a table".into()),
                asset: None,
            },
            caption: String::new(),
            style: SceneStyle::default(),
            overlays: Vec::new(),
            transition: TransitionType::Fade,
        }
    }

    #[test]
    fn test_valid_graph() {
        let graph = SceneGraph::new(vec![scene(1, 5_000), scene(2, 5_000)], GlobalAudio::default())
            .unwrap();
        assert_eq!(graph.total_duration_ms(), 10_000);
        assert_eq!(graph.version, SCENE_GRAPH_VERSION);
    }

    #[test]
    fn test_empty_graph_rejected() {
        let err = SceneGraph::new(vec![], GlobalAudio::default()).unwrap_err();
        assert!(matches!(err, GraphError::EmptyGraph));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err =
            SceneGraph::new(vec![scene(1, 5_000), scene(1, 5_000)], GlobalAudio::default())
                .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateSceneId(1)));
    }

    #[test]
    fn test_total_duration_capped() {
        let scenes: Vec<Scene> = (1..=7).map(|i| scene(i, 10_000)).collect();
        let err = SceneGraph::new(scenes, GlobalAudio::default()).unwrap_err();
        assert!(matches!(err, GraphError::TotalDurationExceeded { total_ms: 70_000 }));
    }

    #[test]
    fn test_engine_requires_prompt() {
        let mut s = scene(1, 5_000);
        s.media = SceneMedia::Video {
            engine: Some(EngineId::Runway),
            prompt: None,
            asset: None,
        };
        let err = SceneGraph::new(vec![s], GlobalAudio::default()).unwrap_err();
        assert!(matches!(err, GraphError::MissingPrompt { scene_id: 1 }));
    }

    #[test]
    fn test_video_media_needs_a_source() {
        let mut s = scene(1, 5_000);
        s.media = SceneMedia::Video {
            engine: None,
            prompt: None,
            asset: None,
        };
        let err = SceneGraph::new(vec![s], GlobalAudio::default()).unwrap_err();
        assert!(matches!(err, GraphError::MediaUnderspecified { scene_id: 1 }));
    }

    #[test]
    fn test_overlay_ranges() {
        let mut s = scene(1, 5_000);
        s.overlays.push(SceneOverlay {
            kind: OverlayType::Logo,
            asset: "logo.png".into(),
            position: OverlayPosition::TopRight,
            scale: 3.0,
            opacity: 0.8,
        });
        let err = SceneGraph::new(vec![s], GlobalAudio::default()).unwrap_err();
        assert!(matches!(err, GraphError::OverlayOutOfRange { field: "scale", .. }));
    }

    #[test]
    fn test_media_tagged_encoding() {
        let media = SceneMedia::Image {
            asset: Some("uploads/x/p.png".into()),
            effect: Some(VisualEffect::KenBurnsZoom),
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["effect"], "ken_burns_zoom");

        let back: SceneMedia = serde_json::from_value(json).unwrap();
        assert_eq!(back, media);
    }

    #[test]
    fn test_json_round_trip_is_structurally_identical() {
        let graph = SceneGraph::new(
            vec![scene(1, 4_000), scene(2, 4_000), scene(3, 4_000)],
            GlobalAudio {
                voice_script: Some("Hello. World.".into()),
                voice_file: None,
                background_music: Some("calm_pulse".into()),
            },
        )
        .unwrap();

        let json = graph.to_json().unwrap();
        let reparsed = SceneGraph::from_json(&json).unwrap();
        assert_eq!(reparsed, graph);
        assert_eq!(reparsed.to_json().unwrap(), json);
    }
}
