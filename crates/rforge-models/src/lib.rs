//! Shared data models for the reelforge render engine.
//!
//! This crate provides Serde-serializable types for:
//! - The Scene Graph (schema version 2.0) — the declarative render plan
//! - The Timeline (schema version 2.0) — authoritative derived timing
//! - Job and Scene durable records with their lifecycle enums
//! - The render configuration tree and preset catalog
//!
//! It also hosts the two pure planning stages that produce those documents:
//! the scene planner and the timeline orchestrator. Nothing in this crate
//! performs I/O, so every invariant is testable without ffmpeg or a network.

pub mod config;
pub mod job;
pub mod orchestrator;
pub mod planner;
pub mod preset;
pub mod scene_graph;
pub mod timeline;

// Re-export common types
pub use config::{
    EngineSettings, EnginesConfig, Limits, ModerationConfig, ModerationStrictness, OutputConfig,
    PresetEnginePrefs, RenderConfig, RotationConfig, SanitizationConfig, TransitionConfig,
    TtsConfig,
};
pub use job::{JobId, JobRecord, JobStatus, RenderRequest, SceneRecord, SceneStatus};
pub use orchestrator::{build_timeline, TimelineBuildError, DEFAULT_TRANSITION_MS};
pub use planner::{plan_scenes, PlanInput, PlanningError, DEFAULT_SCENE_DURATION_MS};
pub use preset::{CaptionPreset, Preset};
pub use scene_graph::{
    EngineId, GlobalAudio, GraphError, MediaType, OverlayPosition, OverlayType, Scene, SceneGraph,
    SceneMedia, SceneOverlay, SceneStyle, TransitionType, VisualEffect, MAX_SCENE_DURATION_MS,
    MAX_TOTAL_DURATION_MS, MIN_SCENE_DURATION_MS, SCENE_GRAPH_VERSION,
};
pub use timeline::{
    AudioTrack, AudioTrackKind, CaptionTrack, DuckRegion, Timeline, TimelineEntry, TimelineError,
    Tracks, Transform, TransitionSpec, VideoTrack,
};
