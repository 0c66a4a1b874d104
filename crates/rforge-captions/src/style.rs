//! Caption style resolution from presets and brand-safe rules.

use rforge_media::BurnStyle;
use rforge_models::Preset;

use crate::wrap::{SAFE_BOTTOM, SAFE_TOP};

/// Minimum font size in brand-safe mode.
pub const BRAND_SAFE_MIN_FONT_PX: u32 = 24;

/// Fade length at caption boundaries, seconds.
const FADE_SECONDS: f64 = 0.2;

/// Resolved caption styling.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub outline_color: String,
    pub background_opacity: f64,
    /// "bottom-center" | "top-center" | "center"
    pub position: String,
}

impl CaptionStyle {
    /// drawtext position expressions honoring the safe zone.
    fn position_exprs(&self) -> (String, String) {
        let x = "(w-text_w)/2".to_string();
        let y = match self.position.as_str() {
            "top-center" => format!("{}", SAFE_TOP + 20),
            "center" => "(h-text_h)/2".to_string(),
            _ => format!("h-{SAFE_BOTTOM}-text_h"),
        };
        (x, y)
    }

    /// Lower this style to the media facade's drawtext parameters.
    pub fn to_burn_style(&self) -> BurnStyle {
        let (x_expr, y_expr) = self.position_exprs();
        BurnStyle {
            font_family: self.font_family.clone(),
            font_size: self.font_size,
            font_color: self.font_color.clone(),
            outline_color: self.outline_color.clone(),
            outline_width: 2,
            box_color: "black".to_string(),
            box_opacity: self.background_opacity,
            x_expr,
            y_expr,
            fade_seconds: FADE_SECONDS,
        }
    }
}

/// Resolve the caption style for a preset.
///
/// Brand-safe mode raises the font size floor to 24 px and locks the font
/// family when the preset names a brand font.
pub fn resolve_style(preset: &Preset, brand_safe: bool) -> CaptionStyle {
    let caption = &preset.caption;

    let mut style = CaptionStyle {
        font_family: caption.font_family.clone(),
        font_size: caption.font_size,
        font_color: caption.font_color.clone(),
        outline_color: caption.outline_color.clone(),
        background_opacity: caption.background_opacity,
        position: caption.position.clone(),
    };

    if brand_safe {
        style.font_size = style.font_size.max(BRAND_SAFE_MIN_FONT_PX);
        if let Some(brand_font) = &caption.brand_font {
            style.font_family = brand_font.clone();
        }
    }

    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::CaptionPreset;

    fn preset_with(font_size: u32, brand_font: Option<&str>) -> Preset {
        Preset {
            id: "t".into(),
            caption: CaptionPreset {
                font_size,
                brand_font: brand_font.map(str::to_string),
                ..CaptionPreset::default()
            },
            mood: None,
            camera_motion: None,
            lighting: None,
            keywords: Vec::new(),
            background_music: None,
            default_caption: String::new(),
            brand_safe_default: true,
        }
    }

    #[test]
    fn test_brand_safe_raises_font_floor() {
        let style = resolve_style(&preset_with(18, None), true);
        assert_eq!(style.font_size, BRAND_SAFE_MIN_FONT_PX);

        let style = resolve_style(&preset_with(18, None), false);
        assert_eq!(style.font_size, 18);
    }

    #[test]
    fn test_brand_font_locked_when_configured() {
        let style = resolve_style(&preset_with(48, Some("Inter")), true);
        assert_eq!(style.font_family, "Inter");

        let style = resolve_style(&preset_with(48, Some("Inter")), false);
        assert_eq!(style.font_family, "Arial");
    }

    #[test]
    fn test_bottom_position_respects_safe_zone() {
        let style = resolve_style(&preset_with(48, None), true);
        let burn = style.to_burn_style();
        assert_eq!(burn.y_expr, format!("h-{SAFE_BOTTOM}-text_h"));
        assert!((burn.fade_seconds - 0.2).abs() < 1e-9);
    }
}
