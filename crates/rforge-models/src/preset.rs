//! Built-in preset catalog.
//!
//! Presets supply caption styling, default mood / camera / lighting, prompt
//! keywords and a background music reference. Unknown preset ids resolve to
//! the default preset so a job never fails on preset lookup.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Caption styling carried by a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionPreset {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub outline_color: String,
    pub background_opacity: f64,
    /// "bottom-center" | "top-center" | "center"
    pub position: String,
    /// Font family forced when brand-safe mode locks the font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_font: Option<String>,
}

impl Default for CaptionPreset {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 48,
            font_color: "white".to_string(),
            outline_color: "black".to_string(),
            background_opacity: 0.5,
            position: "bottom-center".to_string(),
            brand_font: None,
        }
    }
}

/// A render preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub caption: CaptionPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_motion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    /// Keywords appended to every generation prompt.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<String>,
    #[serde(default)]
    pub default_caption: String,
    #[serde(default = "default_true")]
    pub brand_safe_default: bool,
}

fn default_true() -> bool {
    true
}

impl Preset {
    /// Look up a preset by id, falling back to the default preset.
    pub fn lookup(id: &str) -> &'static Preset {
        let presets = builtin_presets();
        presets
            .iter()
            .find(|p| p.id == id)
            .unwrap_or(&presets[0])
    }

    /// Look up a preset by exact id.
    pub fn get(id: &str) -> Option<&'static Preset> {
        builtin_presets().iter().find(|p| p.id == id)
    }
}

/// The built-in catalog, first entry is the default.
pub fn builtin_presets() -> &'static [Preset] {
    static PRESETS: OnceLock<Vec<Preset>> = OnceLock::new();
    PRESETS.get_or_init(|| {
        vec![
            Preset {
                id: "product_hero_clean".to_string(),
                caption: CaptionPreset {
                    font_size: 48,
                    ..CaptionPreset::default()
                },
                mood: Some("elegant".to_string()),
                camera_motion: Some("slow zoom in".to_string()),
                lighting: Some("soft".to_string()),
                keywords: vec![
                    "studio product shot".to_string(),
                    "clean background".to_string(),
                ],
                background_music: Some("calm_pulse".to_string()),
                default_caption: "Discover more".to_string(),
                brand_safe_default: true,
            },
            Preset {
                id: "lifestyle_energetic".to_string(),
                caption: CaptionPreset {
                    font_family: "Helvetica".to_string(),
                    font_size: 54,
                    background_opacity: 0.35,
                    ..CaptionPreset::default()
                },
                mood: Some("upbeat".to_string()),
                camera_motion: Some("orbit".to_string()),
                lighting: Some("bright".to_string()),
                keywords: vec!["dynamic lifestyle".to_string(), "vibrant".to_string()],
                background_music: Some("drive_beat".to_string()),
                default_caption: "Live it up".to_string(),
                brand_safe_default: false,
            },
            Preset {
                id: "minimal_mono".to_string(),
                caption: CaptionPreset {
                    font_size: 44,
                    font_color: "0xEDEDED".to_string(),
                    background_opacity: 0.6,
                    brand_font: Some("Inter".to_string()),
                    ..CaptionPreset::default()
                },
                mood: Some("calm".to_string()),
                camera_motion: Some("static".to_string()),
                lighting: Some("low key".to_string()),
                keywords: vec!["minimalist".to_string(), "monochrome".to_string()],
                background_music: None,
                default_caption: String::new(),
                brand_safe_default: true,
            },
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_preset() {
        let p = Preset::lookup("lifestyle_energetic");
        assert_eq!(p.id, "lifestyle_energetic");
        assert_eq!(p.mood.as_deref(), Some("upbeat"));
    }

    #[test]
    fn test_lookup_unknown_falls_back_to_default() {
        let p = Preset::lookup("no_such_preset");
        assert_eq!(p.id, "product_hero_clean");
        assert!(Preset::get("no_such_preset").is_none());
    }
}
