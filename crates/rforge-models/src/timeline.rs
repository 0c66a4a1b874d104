//! Timeline (schema version 2.0).
//!
//! The Timeline is derived from a Scene Graph and is the single
//! authoritative source for all timing in the final video: time-ordered
//! scene entries plus parallel video, audio and caption tracks. Nothing
//! appears in the output without a timeline entry backing it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene_graph::{OverlayPosition, TransitionType, MAX_TOTAL_DURATION_MS};

/// Frozen schema version for serialized timelines.
pub const TIMELINE_VERSION: &str = "2.0";

/// Errors raised while validating a timeline.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("timeline must contain at least one entry")]
    EmptyTimeline,

    #[error("totalDuration {total_ms}ms outside 1000-{MAX_TOTAL_DURATION_MS}ms")]
    TotalDurationOutOfRange { total_ms: u64 },

    #[error("timeline entries must be in ascending start order (scene {scene_id})")]
    EntriesOutOfOrder { scene_id: u32 },

    #[error("scene {scene_id}: end ({end}) must be greater than start ({start})")]
    InvertedSpan { scene_id: u32, start: u64, end: u64 },

    #[error("timeline entries for scenes {prev} and {next} overlap beyond the transition window")]
    EntriesOverlap { prev: u32, next: u32 },

    #[error("caption \"{text}\" [{start}-{end}] exceeds scene {scene_id} bounds")]
    CaptionOutOfBounds {
        scene_id: u32,
        text: String,
        start: u64,
        end: u64,
    },

    #[error("caption \"{text}\": end must be greater than start")]
    InvertedCaption { text: String },

    #[error("duck region end ({end}) must be greater than start ({start})")]
    InvertedDuckRegion { start: u64, end: u64 },

    #[error("invalid timeline JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transition between two consecutive scenes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSpec {
    #[serde(rename = "type")]
    pub kind: TransitionType,
    /// Transition duration in milliseconds.
    pub duration: u64,
}

impl TransitionSpec {
    pub fn new(kind: TransitionType, duration: u64) -> Self {
        Self { kind, duration }
    }
}

/// Position, scale and opacity transform for a video element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    #[serde(default)]
    pub position: OverlayPosition,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

fn default_scale() -> f64 {
    1.0
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: OverlayPosition::Center,
            scale: 1.0,
            opacity: 1.0,
            x: None,
            y: None,
        }
    }
}

/// A video layer entry in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoTrack {
    pub scene_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    /// Layer 0 is the scene's primary media; overlays stack above it.
    #[serde(default)]
    pub layer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// A region where music volume is reduced while voice is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuckRegion {
    /// Start in milliseconds.
    pub start: u64,
    /// End in milliseconds.
    pub end: u64,
    /// dB reduction applied inside the region.
    #[serde(default = "default_duck_amount")]
    pub duck_amount: f64,
    /// Fade-down seconds at the region boundary.
    #[serde(default = "default_duck_fade")]
    pub fade_in: f64,
    /// Fade-up seconds at the region boundary.
    #[serde(default = "default_duck_fade")]
    pub fade_out: f64,
}

fn default_duck_amount() -> f64 {
    -12.0
}

fn default_duck_fade() -> f64 {
    0.2
}

/// Audio track kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioTrackKind {
    Voiceover,
    Music,
    Sfx,
}

/// An audio track entry in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    #[serde(rename = "type")]
    pub kind: AudioTrackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Start in milliseconds.
    pub start: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    /// Linear gain in [0, 2].
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duck_regions: Vec<DuckRegion>,
}

fn default_volume() -> f64 {
    1.0
}

/// A timed caption entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub text: String,
    /// Display start in milliseconds.
    pub start: u64,
    /// Display end in milliseconds.
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Multi-track composition data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    #[serde(default)]
    pub video: Vec<VideoTrack>,
    #[serde(default)]
    pub audio: Vec<AudioTrack>,
    #[serde(default)]
    pub captions: Vec<CaptionTrack>,
}

/// A scene's time slot on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub scene_id: u32,
    /// Start in milliseconds.
    pub start: u64,
    /// End in milliseconds.
    pub end: u64,
    /// Transition toward the next entry; None on the last entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionSpec>,
}

impl TimelineEntry {
    /// Overlap the next entry may borrow from this one.
    pub fn transition_ms(&self) -> u64 {
        self.transition.map(|t| t.duration).unwrap_or(0)
    }
}

/// Top-level Timeline document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    #[serde(default = "default_version")]
    pub version: String,
    /// Total duration in milliseconds.
    pub total_duration: u64,
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub tracks: Tracks,
}

fn default_version() -> String {
    TIMELINE_VERSION.to_string()
}

impl Timeline {
    /// Build a validated timeline.
    pub fn new(
        total_duration: u64,
        timeline: Vec<TimelineEntry>,
        tracks: Tracks,
    ) -> Result<Self, TimelineError> {
        let tl = Self {
            version: default_version(),
            total_duration,
            timeline,
            tracks,
        };
        tl.validate()?;
        Ok(tl)
    }

    /// Parse and validate a serialized timeline.
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        let tl: Timeline = serde_json::from_str(json)?;
        tl.validate()?;
        Ok(tl)
    }

    /// Serialize to the canonical JSON document.
    pub fn to_json(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Entry for a given scene, if present.
    pub fn entry_for_scene(&self, scene_id: u32) -> Option<&TimelineEntry> {
        self.timeline.iter().find(|e| e.scene_id == scene_id)
    }

    /// Check all timeline invariants.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if self.timeline.is_empty() {
            return Err(TimelineError::EmptyTimeline);
        }
        if !(1_000..=MAX_TOTAL_DURATION_MS).contains(&self.total_duration) {
            return Err(TimelineError::TotalDurationOutOfRange {
                total_ms: self.total_duration,
            });
        }

        for entry in &self.timeline {
            if entry.end <= entry.start {
                return Err(TimelineError::InvertedSpan {
                    scene_id: entry.scene_id,
                    start: entry.start,
                    end: entry.end,
                });
            }
        }

        for pair in self.timeline.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            if curr.start < prev.start {
                return Err(TimelineError::EntriesOutOfOrder {
                    scene_id: curr.scene_id,
                });
            }
            // Consecutive entries may overlap only by the preceding
            // entry's transition duration.
            let max_overlap = prev.transition_ms();
            if curr.start + max_overlap < prev.end {
                return Err(TimelineError::EntriesOverlap {
                    prev: prev.scene_id,
                    next: curr.scene_id,
                });
            }
        }

        let bounds: std::collections::HashMap<u32, (u64, u64)> = self
            .timeline
            .iter()
            .map(|e| (e.scene_id, (e.start, e.end)))
            .collect();

        for cap in &self.tracks.captions {
            if cap.end <= cap.start {
                return Err(TimelineError::InvertedCaption {
                    text: cap.text.clone(),
                });
            }
            if let Some(scene_id) = cap.scene_id {
                if let Some(&(s_start, s_end)) = bounds.get(&scene_id) {
                    if cap.start < s_start || cap.end > s_end {
                        return Err(TimelineError::CaptionOutOfBounds {
                            scene_id,
                            text: cap.text.clone(),
                            start: cap.start,
                            end: cap.end,
                        });
                    }
                }
            }
        }

        for track in &self.tracks.audio {
            for region in &track.duck_regions {
                if region.end <= region.start {
                    return Err(TimelineError::InvertedDuckRegion {
                        start: region.start,
                        end: region.end,
                    });
                }
            }
        }

        Ok(())
    }
}
