//! Per-scene engine selection.

use tracing::info;

use rforge_models::{EngineId, MediaType, Preset, RenderConfig, Scene};

use crate::adapter::StyleHints;
use crate::prompt::build_prompt;
use crate::rotation::FailureTracker;

/// Which engine renders a scene, plus the constructed prompt.
#[derive(Debug, Clone)]
pub struct EngineAssignment {
    pub scene_id: u32,
    pub engine: EngineId,
    pub prompt: String,
    pub image_path: Option<String>,
    pub duration_seconds: f64,
    pub style_hints: StyleHints,
}

/// Inputs to engine selection.
#[derive(Clone, Copy)]
pub struct SelectorOptions<'a> {
    pub config: &'a RenderConfig,
    pub preset: &'a Preset,
    pub brand_safe: bool,
    /// Explicit user override from the render request.
    pub engine_override: Option<EngineId>,
    /// Rotation tracker; None disables rotation entirely.
    pub tracker: Option<&'a FailureTracker>,
}

const RUNWAY_KEYWORDS: &[&str] = &["realistic", "cinematic", "photorealis"];
const PIKA_KEYWORDS: &[&str] = &["stylized", "creative", "artistic", "anime", "abstract"];
const LUMA_KEYWORDS: &[&str] = &["physics", "3d", "product", "showcase", "rotation"];

/// Select the engine for a scene.
///
/// Priority, first match wins:
/// 1. Scene explicitly names an engine.
/// 2. Image media renders locally.
/// 3. Realistic/cinematic styles go to Runway.
/// 4. Stylized/creative styles go to Pika.
/// 5. Physics/3D/product styles go to Luma.
/// 6. The configured default (user override, then per-preset preference,
///    then global default).
///
/// Rotation may then substitute a healthier alternative for a failing
/// engine.
pub fn select_engine_for_scene(scene: &Scene, opts: &SelectorOptions<'_>) -> EngineAssignment {
    let mut engine = if let Some(explicit) = scene.media.engine() {
        explicit
    } else if scene.media.media_type() == MediaType::Image {
        EngineId::Local
    } else {
        select_by_style(scene).unwrap_or_else(|| default_engine(opts))
    };

    if engine != EngineId::Local {
        if let Some(tracker) = opts.tracker {
            let rotation = &opts.config.engine_rotation;
            if tracker.should_rotate(engine, rotation) {
                if let Some(alternative) = tracker.healthy_alternative(
                    engine,
                    &opts.config.engines.fallback_chain,
                    rotation,
                ) {
                    info!(from = %engine, to = %alternative, "engine rotated");
                    engine = alternative;
                }
            }
        }
    }

    let prompt = build_prompt(
        scene,
        opts.brand_safe,
        &opts.preset.keywords,
        &opts.config.prompt_sanitization,
    );

    EngineAssignment {
        scene_id: scene.id,
        engine,
        prompt,
        image_path: scene.media.asset().map(str::to_string),
        duration_seconds: scene.duration as f64 / 1000.0,
        style_hints: StyleHints {
            mood: scene.style.mood.clone(),
            camera_motion: scene.style.camera_motion.clone(),
            lighting: scene.style.lighting.clone(),
        },
    }
}

fn select_by_style(scene: &Scene) -> Option<EngineId> {
    let haystack = format!(
        "{} {}",
        scene.style.keywords(),
        scene.description.to_lowercase()
    );

    if RUNWAY_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        return Some(EngineId::Runway);
    }
    if PIKA_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        return Some(EngineId::Pika);
    }
    if LUMA_KEYWORDS.iter().any(|kw| haystack.contains(kw)) {
        return Some(EngineId::Luma);
    }
    None
}

fn default_engine(opts: &SelectorOptions<'_>) -> EngineId {
    if let Some(engine) = opts.engine_override {
        return engine;
    }
    if let Some(prefs) = opts.config.preset_engine_prefs.get(&opts.preset.id) {
        if let Some(engine) = prefs.preferred_engine {
            return engine;
        }
    }
    opts.config.engines.default_engine
}

/// The ordered fallback chain for a preset, honoring per-preset overrides.
pub fn fallback_chain(config: &RenderConfig, preset_id: &str) -> Vec<EngineId> {
    config
        .preset_engine_prefs
        .get(preset_id)
        .and_then(|prefs| prefs.fallback_override.clone())
        .unwrap_or_else(|| config.engines.fallback_chain.clone())
}
