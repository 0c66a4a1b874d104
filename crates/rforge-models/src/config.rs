//! Render configuration tree.
//!
//! Every section deserializes with full defaults so an empty config file is
//! a valid configuration. The worker layers file + environment sources on
//! top of these defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scene_graph::EngineId;

/// Output encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub pixel_format: String,
    pub max_bitrate: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            codec: "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            max_bitrate: "12M".to_string(),
        }
    }
}

/// Scene transition defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionConfig {
    pub default_duration_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 500,
        }
    }
}

/// Input and total-duration limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    pub max_asset_mb: u64,
    pub max_image_edge_px: u32,
    pub max_total_duration_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_asset_mb: 20,
            max_image_edge_px: 4096,
            max_total_duration_ms: 60_000,
        }
    }
}

/// Per-engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub enabled: bool,
    pub timeout_seconds: u64,
    pub max_clip_duration_seconds: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 60,
            max_clip_duration_seconds: 10.0,
        }
    }
}

/// Engine selection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnginesConfig {
    pub default_engine: EngineId,
    pub fallback_chain: Vec<EngineId>,
    pub runway: EngineSettings,
    pub pika: EngineSettings,
    pub luma: EngineSettings,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            default_engine: EngineId::Runway,
            fallback_chain: vec![EngineId::Runway, EngineId::Pika, EngineId::Luma],
            runway: EngineSettings::default(),
            pika: EngineSettings::default(),
            luma: EngineSettings::default(),
        }
    }
}

impl EnginesConfig {
    /// Settings for a given engine; the local renderer uses defaults.
    pub fn settings(&self, engine: EngineId) -> &EngineSettings {
        match engine {
            EngineId::Runway => &self.runway,
            EngineId::Pika => &self.pika,
            EngineId::Luma => &self.luma,
            EngineId::Local => &self.runway,
        }
    }
}

/// Prompt sanitization rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SanitizationConfig {
    /// Terms removed outright (whole word, case-insensitive).
    pub blocklist: Vec<String>,
    /// Term replacements applied after blocklist removal.
    pub substitutions: BTreeMap<String, String>,
    pub max_prompt_length: usize,
    pub brand_safe_suffix: String,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        let substitutions = [
            ("shoot", "film"),
            ("shooting", "filming"),
            ("explode", "burst open"),
            ("explosion", "dynamic burst"),
            ("kill", "eliminate"),
            ("weapon", "tool"),
            ("gun", "device"),
            ("blood", "red liquid"),
            ("violent", "intense"),
            ("nude", "exposed"),
            ("naked", "unclothed"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            blocklist: Vec::new(),
            substitutions,
            max_prompt_length: 500,
            brand_safe_suffix: "professional, brand-safe, clean aesthetic".to_string(),
        }
    }
}

/// Per-preset engine preferences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresetEnginePrefs {
    pub preferred_engine: Option<EngineId>,
    pub fallback_override: Option<Vec<EngineId>>,
}

/// Smart-rotation thresholds. Disabled by default; counters are
/// process-local and reset on start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotationConfig {
    pub enabled: bool,
    pub failure_threshold: f64,
    pub window_seconds: u64,
    pub min_attempts: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: 0.5,
            window_seconds: 300,
            min_attempts: 3,
        }
    }
}

/// Content moderation pre-screen strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStrictness {
    Strict,
    #[default]
    Standard,
    Off,
}

/// Content moderation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModerationConfig {
    pub strictness: ModerationStrictness,
    pub blocklist: Vec<String>,
}

/// TTS provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TtsConfig {
    pub primary_provider: String,
    pub backup_provider: String,
    pub voice_name: String,
    pub speed: f64,
    pub output_format: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            primary_provider: "elevenlabs".to_string(),
            backup_provider: "openai".to_string(),
            voice_name: "default".to_string(),
            speed: 1.0,
            output_format: "mp3".to_string(),
        }
    }
}

/// The full configuration tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub output: OutputConfig,
    pub transition: TransitionConfig,
    pub limits: Limits,
    pub engines: EnginesConfig,
    pub prompt_sanitization: SanitizationConfig,
    pub preset_engine_prefs: BTreeMap<String, PresetEnginePrefs>,
    pub engine_rotation: RotationConfig,
    pub content_moderation: ModerationConfig,
    pub tts: TtsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg: RenderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.output.width, 1080);
        assert_eq!(cfg.output.height, 1920);
        assert_eq!(cfg.transition.default_duration_ms, 500);
        assert_eq!(cfg.prompt_sanitization.max_prompt_length, 500);
        assert_eq!(
            cfg.engines.fallback_chain,
            vec![EngineId::Runway, EngineId::Pika, EngineId::Luma]
        );
        assert!(!cfg.engine_rotation.enabled);
    }

    #[test]
    fn test_partial_override() {
        let cfg: RenderConfig = serde_json::from_str(
            r#"{"engines": {"defaultEngine": "pika", "runway": {"enabled": false}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.engines.default_engine, EngineId::Pika);
        assert!(!cfg.engines.runway.enabled);
        assert!(cfg.engines.pika.enabled);
    }

    #[test]
    fn test_default_substitutions_present() {
        let cfg = RenderConfig::default();
        assert_eq!(
            cfg.prompt_sanitization.substitutions.get("gun").map(String::as_str),
            Some("device")
        );
    }
}
