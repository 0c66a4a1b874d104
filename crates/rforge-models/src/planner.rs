//! Heuristic scene planner — converts user inputs into a validated
//! [`SceneGraph`].
//!
//! Planning strategies, first match wins:
//! 1. Prompt contains `<SHOT N>` markers — one scene per marker-delimited
//!    segment.
//! 2. Prompt has any text — one scene per sentence.
//! 3. Media assets only — one Ken-Burns scene per asset.
//! 4. Nothing — a 3-scene Intro / Feature / CTA template from the preset.

use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::preset::Preset;
use crate::scene_graph::{
    EngineId, GlobalAudio, GraphError, Scene, SceneGraph, SceneMedia, SceneStyle, TransitionType,
    VisualEffect, MAX_TOTAL_DURATION_MS,
};

/// Duration given to every scene before the assignment pass.
pub const DEFAULT_SCENE_DURATION_MS: u64 = 5_000;

/// Errors raised by the planner.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("planner produced zero scenes")]
    ZeroScenes,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Inputs to a planning run.
#[derive(Debug, Clone, Default)]
pub struct PlanInput {
    /// Storage references of user-supplied images, in upload order.
    pub media_assets: Vec<String>,
    pub prompt: String,
    pub preset_id: String,
    pub brand_safe: bool,
    pub target_duration_seconds: u32,
    /// Measured voiceover length; durations follow the voice when present.
    pub voiceover_duration_ms: Option<u64>,
    pub engine_preference: Option<String>,
}

fn shot_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<SHOT\s*\d+\s*>").expect("valid shot pattern"))
}

/// Split text into sentences on `.`, `!`, `?` terminators, keeping the
/// terminator attached.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Produce a validated scene graph from user inputs.
pub fn plan_scenes(input: &PlanInput) -> Result<SceneGraph, PlanningError> {
    let preset = Preset::lookup(&input.preset_id);
    let target_ms = (u64::from(input.target_duration_seconds) * 1_000).min(MAX_TOTAL_DURATION_MS);

    // Unknown preference strings are ignored; the engine manager applies
    // its configured default instead.
    let engine_pref = input
        .engine_preference
        .as_deref()
        .and_then(|s| EngineId::from_str(s).ok());

    let mut scenes = if !input.prompt.is_empty() && shot_pattern().is_match(&input.prompt) {
        plan_from_shots(&input.prompt, &input.media_assets, preset, engine_pref)
    } else if !input.prompt.trim().is_empty() {
        plan_from_sentences(&input.prompt, &input.media_assets, preset, engine_pref)
    } else if !input.media_assets.is_empty() {
        plan_from_images(&input.media_assets, preset)
    } else {
        plan_from_template(preset)
    };

    if scenes.is_empty() {
        return Err(PlanningError::ZeroScenes);
    }

    assign_durations(&mut scenes, target_ms, input.voiceover_duration_ms);

    if input.brand_safe {
        for scene in &mut scenes {
            if !scene.transition.is_brand_safe() {
                scene.transition = TransitionType::Fade;
            }
        }
    }

    let voice_script = if input.prompt.trim().is_empty() {
        None
    } else {
        Some(strip_shot_markers(&input.prompt))
    };
    let global_audio = GlobalAudio {
        voice_script,
        voice_file: None,
        background_music: preset.background_music.clone(),
    };

    let graph = SceneGraph::new(scenes, global_audio)?;
    info!(
        scene_count = graph.scenes.len(),
        total_duration_ms = graph.total_duration_ms(),
        "scene plan created"
    );
    Ok(graph)
}

fn strip_shot_markers(prompt: &str) -> String {
    shot_pattern().replace_all(prompt, " ").trim().to_string()
}

// Strategy 1: explicit <SHOT N> markers.
fn plan_from_shots(
    prompt: &str,
    media_assets: &[String],
    preset: &Preset,
    engine_pref: Option<EngineId>,
) -> Vec<Scene> {
    let texts: Vec<String> = shot_pattern()
        .split(prompt)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            // Images attach positionally; surplus shots become video scenes.
            let image = media_assets.get(i).cloned();
            scene_for_text(i as u32 + 1, text, image, preset, engine_pref)
        })
        .collect()
}

// Strategy 2: one scene per sentence.
fn plan_from_sentences(
    prompt: &str,
    media_assets: &[String],
    preset: &Preset,
    engine_pref: Option<EngineId>,
) -> Vec<Scene> {
    let mut sentences = split_sentences(prompt);
    if sentences.is_empty() {
        sentences = vec![prompt.trim().to_string()];
    }

    sentences
        .iter()
        .enumerate()
        .map(|(i, sentence)| {
            // Cycle through available images.
            let image = if media_assets.is_empty() {
                None
            } else {
                Some(media_assets[i % media_assets.len()].clone())
            };
            scene_for_text(i as u32 + 1, sentence, image, preset, engine_pref)
        })
        .collect()
}

fn scene_for_text(
    id: u32,
    text: &str,
    image: Option<String>,
    preset: &Preset,
    engine_pref: Option<EngineId>,
) -> Scene {
    let media = match image {
        Some(asset) => SceneMedia::Image {
            asset: Some(asset),
            effect: Some(VisualEffect::KenBurnsZoom),
        },
        None => SceneMedia::Video {
            engine: engine_pref,
            prompt: Some(text.to_string()),
            asset: None,
        },
    };

    Scene {
        id,
        description: truncate_chars(text, 120),
        duration: DEFAULT_SCENE_DURATION_MS,
        media,
        caption: text.to_string(),
        style: extract_style(text, preset),
        overlays: Vec::new(),
        transition: TransitionType::Fade,
    }
}

// Strategy 3: one Ken-Burns scene per image.
fn plan_from_images(media_assets: &[String], preset: &Preset) -> Vec<Scene> {
    media_assets
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let id = i as u32 + 1;
            Scene {
                id,
                description: format!("Product image {id}"),
                duration: DEFAULT_SCENE_DURATION_MS,
                media: SceneMedia::Image {
                    asset: Some(asset.clone()),
                    effect: Some(VisualEffect::KenBurnsZoom),
                },
                caption: preset.default_caption.clone(),
                style: style_from_preset(preset),
                overlays: Vec::new(),
                transition: TransitionType::Fade,
            }
        })
        .collect()
}

// Strategy 4: generic template when no inputs are provided.
fn plan_from_template(preset: &Preset) -> Vec<Scene> {
    let templates = [
        ("Intro — product reveal", "Introducing our product"),
        ("Feature highlight", "Discover the key features"),
        ("Call to action", "Get yours today"),
    ];

    templates
        .iter()
        .enumerate()
        .map(|(i, (description, caption))| Scene {
            id: i as u32 + 1,
            description: (*description).to_string(),
            duration: DEFAULT_SCENE_DURATION_MS,
            media: SceneMedia::Image {
                asset: None,
                effect: Some(VisualEffect::Static),
            },
            caption: (*caption).to_string(),
            style: style_from_preset(preset),
            overlays: Vec::new(),
            transition: TransitionType::Fade,
        })
        .collect()
}

/// Assign scene durations so the total stays within `target_ms`.
fn assign_durations(scenes: &mut [Scene], target_ms: u64, voiceover_duration_ms: Option<u64>) {
    let n = scenes.len() as u64;

    match voiceover_duration_ms {
        // Character count as a proxy for speech time per scene.
        Some(voice_ms) if voice_ms > 0 => {
            let total_chars: u64 = scenes
                .iter()
                .map(|s| s.caption.chars().count().max(1) as u64)
                .sum();
            let effective = voice_ms.min(MAX_TOTAL_DURATION_MS);
            for scene in scenes.iter_mut() {
                let chars = scene.caption.chars().count().max(1) as u64;
                scene.duration = ((chars * effective) / total_chars.max(1)).max(1_000);
            }
        }
        _ => {
            let per_scene = (target_ms / n.max(1)).max(1_000);
            for scene in scenes.iter_mut() {
                scene.duration = per_scene;
            }
        }
    }

    // Proportional reduction preserving the 1s floor.
    let total: u64 = scenes.iter().map(|s| s.duration).sum();
    if total > MAX_TOTAL_DURATION_MS {
        for scene in scenes.iter_mut() {
            scene.duration =
                ((scene.duration * MAX_TOTAL_DURATION_MS) / total).max(1_000);
        }
    }
}

const MOOD_KEYWORDS: &[(&str, &str)] = &[
    ("cinematic", "cinematic"),
    ("dramatic", "dramatic"),
    ("warm", "warm"),
    ("cool", "cool"),
    ("upbeat", "upbeat"),
    ("fun", "fun"),
    ("elegant", "elegant"),
    ("neon", "neon"),
];

const CAMERA_KEYWORDS: &[(&str, &str)] = &[
    ("slow zoom", "slow zoom in"),
    ("dolly", "slow dolly in"),
    ("pan left", "pan left"),
    ("pan right", "pan right"),
    ("orbit", "orbit"),
    ("static", "static"),
];

/// Extract mood / camera hints from text, falling back to the preset.
fn extract_style(text: &str, preset: &Preset) -> SceneStyle {
    let lower = text.to_lowercase();

    let mood = MOOD_KEYWORDS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, v)| (*v).to_string())
        .or_else(|| preset.mood.clone());

    let camera_motion = CAMERA_KEYWORDS
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, v)| (*v).to_string())
        .or_else(|| preset.camera_motion.clone());

    SceneStyle {
        mood,
        camera_motion,
        lighting: preset.lighting.clone(),
    }
}

fn style_from_preset(preset: &Preset) -> SceneStyle {
    SceneStyle {
        mood: preset.mood.clone(),
        camera_motion: preset.camera_motion.clone(),
        lighting: preset.lighting.clone(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::MediaType;

    fn input(prompt: &str, target: u32) -> PlanInput {
        PlanInput {
            media_assets: Vec::new(),
            prompt: prompt.to_string(),
            preset_id: "product_hero_clean".to_string(),
            brand_safe: true,
            target_duration_seconds: target,
            voiceover_duration_ms: None,
            engine_preference: None,
        }
    }

    #[test]
    fn test_three_sentence_plan() {
        let graph =
            plan_scenes(&input("Product reveal. Key features. Call to action.", 15)).unwrap();

        assert_eq!(graph.scenes.len(), 3);
        let ids: Vec<u32> = graph.scenes.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(graph.total_duration_ms() <= 15_000);
        for scene in &graph.scenes {
            assert_eq!(scene.duration, 5_000);
            assert!(scene.transition.is_brand_safe());
        }
    }

    #[test]
    fn test_single_sentence_plan() {
        let graph = plan_scenes(&input("A stunning product reveal.", 6)).unwrap();
        assert_eq!(graph.scenes.len(), 1);
        assert!(graph.total_duration_ms() <= 6_000);
        assert_eq!(graph.scenes[0].caption, "A stunning product reveal.");
    }

    #[test]
    fn test_fifteen_images_fit_sixty_seconds() {
        let mut inp = input("", 60);
        inp.media_assets = (1..=15).map(|i| format!("uploads/u/p{i}.png")).collect();

        let graph = plan_scenes(&inp).unwrap();
        assert_eq!(graph.scenes.len(), 15);
        assert_eq!(graph.total_duration_ms(), 60_000);
        for scene in &graph.scenes {
            assert_eq!(scene.media.media_type(), MediaType::Image);
        }
    }

    #[test]
    fn test_shot_markers_take_priority_over_sentences() {
        let graph = plan_scenes(&input(
            "<SHOT 1> A red sneaker spins. <SHOT 2> Close-up on stitching.",
            10,
        ))
        .unwrap();
        assert_eq!(graph.scenes.len(), 2);
        assert!(graph.scenes[0].caption.starts_with("A red sneaker"));
    }

    #[test]
    fn test_template_when_no_inputs() {
        let graph = plan_scenes(&input("", 15)).unwrap();
        assert_eq!(graph.scenes.len(), 3);
        assert_eq!(graph.scenes[0].description, "Intro — product reveal");
        assert!(graph.global_audio.voice_script.is_none());
    }

    #[test]
    fn test_images_cycle_across_sentences() {
        let mut inp = input("One. Two. Three.", 15);
        inp.media_assets = vec!["a.png".to_string(), "b.png".to_string()];

        let graph = plan_scenes(&inp).unwrap();
        assert_eq!(graph.scenes[0].media.asset(), Some("a.png"));
        assert_eq!(graph.scenes[1].media.asset(), Some("b.png"));
        assert_eq!(graph.scenes[2].media.asset(), Some("a.png"));
    }

    #[test]
    fn test_voiceover_weighted_durations() {
        let mut inp = input("Hi. This sentence is quite a bit longer than the first.", 30);
        inp.voiceover_duration_ms = Some(10_000);

        let graph = plan_scenes(&inp).unwrap();
        assert_eq!(graph.scenes.len(), 2);
        // The short first sentence hits the 1s floor; the long one takes
        // most of the measured voice duration.
        assert_eq!(graph.scenes[0].duration, 1_000);
        assert!(graph.scenes[1].duration > 8_000);
        assert!(graph.total_duration_ms() <= MAX_TOTAL_DURATION_MS);
    }

    #[test]
    fn test_engine_preference_flows_into_video_scenes() {
        let mut inp = input("A neon city timelapse.", 8);
        inp.engine_preference = Some("pika".to_string());

        let graph = plan_scenes(&inp).unwrap();
        assert_eq!(graph.scenes[0].media.engine(), Some(EngineId::Pika));
    }

    #[test]
    fn test_unknown_engine_preference_ignored() {
        let mut inp = input("A neon city timelapse.", 8);
        inp.engine_preference = Some("sora".to_string());

        let graph = plan_scenes(&inp).unwrap();
        assert_eq!(graph.scenes[0].media.engine(), None);
    }

    #[test]
    fn test_style_keywords_extracted_from_text() {
        let graph = plan_scenes(&input("A cinematic slow zoom over the product.", 8)).unwrap();
        let style = &graph.scenes[0].style;
        assert_eq!(style.mood.as_deref(), Some("cinematic"));
        assert_eq!(style.camera_motion.as_deref(), Some("slow zoom in"));
    }

    #[test]
    fn test_sentence_splitting() {
        assert_eq!(
            split_sentences("One. Two! Three? Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
        assert!(split_sentences("   ").is_empty());
    }
}
