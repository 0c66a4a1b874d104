//! Prompt construction, sanitization and moderation rephrasing.

use regex::Regex;

use rforge_models::{
    ModerationConfig, ModerationStrictness, SanitizationConfig, Scene, SceneStyle,
};

/// Softener table applied when rephrasing after a moderation rejection.
const SOFTENERS: &[(&str, &str)] = &[
    ("attack", "approach"),
    ("destroy", "transform"),
    ("crash", "collide gently"),
    ("fight", "compete"),
    ("death", "conclusion"),
    ("danger", "challenge"),
    ("fire", "energy"),
    ("burn", "glow"),
];

fn word_regex(term: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(term))).ok()
}

/// Build the final generation prompt for a scene.
///
/// Composition order: scene prompt/description, style keywords, preset
/// keywords, then the brand-safe suffix. Brand-safe prompts additionally
/// pass through [`sanitize_prompt`]. The result is truncated to the
/// configured maximum at a word boundary.
pub fn build_prompt(
    scene: &Scene,
    brand_safe: bool,
    preset_keywords: &[String],
    config: &SanitizationConfig,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(prompt) = scene.media.prompt() {
        parts.push(prompt.to_string());
    } else if !scene.description.is_empty() {
        parts.push(scene.description.clone());
    }

    let style = style_keywords(&scene.style);
    if !style.is_empty() {
        parts.push(style);
    }

    if !preset_keywords.is_empty() {
        parts.push(preset_keywords.join(", "));
    }

    if brand_safe {
        parts.push(config.brand_safe_suffix.clone());
    }

    let mut prompt = parts.join(". ");
    if brand_safe {
        prompt = sanitize_prompt(&prompt, config);
    }
    truncate_at_word(&prompt, config.max_prompt_length)
}

/// Convert scene style fields into a keyword phrase.
pub fn style_keywords(style: &SceneStyle) -> String {
    let mut keywords: Vec<String> = Vec::new();
    if let Some(mood) = &style.mood {
        keywords.push(format!("{mood} mood"));
    }
    if let Some(camera) = &style.camera_motion {
        keywords.push(format!("camera motion {camera}"));
    }
    if let Some(lighting) = &style.lighting {
        keywords.push(format!("{lighting} lighting"));
    }
    keywords.join(", ")
}

/// Remove blocklisted terms and apply substitutions.
///
/// Whole-word, case-insensitive; repeated whitespace collapses afterwards.
/// The operation is idempotent: substitution targets are never themselves
/// blocked or substituted.
pub fn sanitize_prompt(prompt: &str, config: &SanitizationConfig) -> String {
    let mut result = prompt.to_string();

    for term in &config.blocklist {
        if let Some(re) = word_regex(term) {
            result = re.replace_all(&result, "").into_owned();
        }
    }

    for (term, replacement) in &config.substitutions {
        if let Some(re) = word_regex(term) {
            result = re.replace_all(&result, replacement.as_str()).into_owned();
        }
    }

    collapse_whitespace(&result)
}

/// Rephrase a prompt rejected by content moderation: sanitize, soften
/// aggressive vocabulary, and append a safe-content cue.
pub fn rephrase_for_moderation(prompt: &str, config: &SanitizationConfig) -> String {
    let mut result = sanitize_prompt(prompt, config);

    for (term, replacement) in SOFTENERS {
        if let Some(re) = word_regex(term) {
            result = re.replace_all(&result, *replacement).into_owned();
        }
    }

    if !result.to_lowercase().contains("safe content") {
        result.push_str(". Professional, safe content, suitable for all audiences");
    }
    result.trim().to_string()
}

/// Pre-screen for strict moderation mode: true when the prompt must not be
/// submitted to any external provider.
pub fn moderation_blocked(prompt: &str, config: &ModerationConfig) -> bool {
    if config.strictness != ModerationStrictness::Strict {
        return false;
    }
    config
        .blocklist
        .iter()
        .filter_map(|term| word_regex(term))
        .any(|re| re.is_match(prompt))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// Truncate at a word boundary, appending an ellipsis when text is dropped.
fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(3);
    let truncated: String = text.chars().take(budget).collect();
    let cut = match truncated.rfind(' ') {
        Some(pos) if pos > 0 => &truncated[..pos],
        _ => truncated.as_str(),
    };
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::{SceneMedia, TransitionType};

    fn config() -> SanitizationConfig {
        SanitizationConfig::default()
    }

    fn scene(prompt: &str) -> Scene {
        Scene {
            id: 1,
            description: prompt.to_string(),
            duration: 5_000,
            media: SceneMedia::Video {
                engine: None,
                prompt: Some(prompt.to_string()),
                asset: None,
            },
            caption: String::new(),
            style: SceneStyle {
                mood: Some("elegant".into()),
                camera_motion: Some("slow zoom in".into()),
                lighting: None,
            },
            overlays: Vec::new(),
            transition: TransitionType::Fade,
        }
    }

    #[test]
    fn test_build_prompt_composition_order() {
        let prompt = build_prompt(
            &scene("A red sneaker on a pedestal"),
            true,
            &["studio product shot".to_string()],
            &config(),
        );
        let sneaker = prompt.find("red sneaker").unwrap();
        let mood = prompt.find("elegant mood").unwrap();
        let preset = prompt.find("studio product shot").unwrap();
        let suffix = prompt.find("brand-safe").unwrap();
        assert!(sneaker < mood && mood < preset && preset < suffix);
    }

    #[test]
    fn test_sanitize_substitutions_whole_word() {
        let cfg = config();
        assert_eq!(
            sanitize_prompt("a photo shoot with a gun", &cfg),
            "a photo film with a device"
        );
        // Substrings are untouched.
        assert_eq!(sanitize_prompt("gunmetal gray", &cfg), "gunmetal gray");
    }

    #[test]
    fn test_sanitize_blocklist_removal() {
        let mut cfg = config();
        cfg.blocklist.push("brandx".to_string());
        assert_eq!(
            sanitize_prompt("our BrandX competitor demo", &cfg),
            "our competitor demo"
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let mut cfg = config();
        cfg.blocklist.push("acme".to_string());
        for prompt in [
            "shoot an explosion near the weapon cache",
            "ACME gun range, blood red sky",
            "plain safe text already",
            "  spaced   out   text  ",
        ] {
            let once = sanitize_prompt(prompt, &cfg);
            let twice = sanitize_prompt(&once, &cfg);
            assert_eq!(once, twice, "prompt {prompt:?}");
        }
    }

    #[test]
    fn test_rephrase_softens_and_appends_cue() {
        let out = rephrase_for_moderation("robots attack and destroy the arena", &config());
        assert!(out.contains("approach"));
        assert!(out.contains("transform"));
        assert!(out.to_lowercase().contains("safe content"));
    }

    #[test]
    fn test_rephrase_does_not_duplicate_cue() {
        let once = rephrase_for_moderation("a fight scene", &config());
        let twice = rephrase_for_moderation(&once, &config());
        assert_eq!(once.matches("safe content").count(), 1);
        assert_eq!(twice.matches("safe content").count(), 1);
    }

    #[test]
    fn test_truncation_at_word_boundary() {
        let long = "word ".repeat(200);
        let out = truncate_at_word(&long, 50);
        assert!(out.chars().count() <= 50);
        assert!(out.ends_with("..."));
        assert!(!out.contains("wor..."));
    }

    #[test]
    fn test_moderation_gate_only_in_strict_mode() {
        let mut cfg = ModerationConfig {
            blocklist: vec!["contraband".to_string()],
            ..Default::default()
        };
        assert!(!moderation_blocked("contraband showcase", &cfg));

        cfg.strictness = ModerationStrictness::Strict;
        assert!(moderation_blocked("contraband showcase", &cfg));
        assert!(!moderation_blocked("clean product", &cfg));
    }
}
