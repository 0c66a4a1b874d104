//! Synthesized video sources: Ken-Burns loops and color cards.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Ken-Burns motion variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KenBurnsEffect {
    ZoomIn,
    ZoomOut,
    PanUp,
    PanDown,
}

impl KenBurnsEffect {
    /// Deterministic variant selection from a scene id.
    pub fn for_scene(scene_id: u32) -> Self {
        match scene_id % 4 {
            0 => KenBurnsEffect::ZoomIn,
            1 => KenBurnsEffect::ZoomOut,
            2 => KenBurnsEffect::PanUp,
            _ => KenBurnsEffect::PanDown,
        }
    }

    fn zoompan_expr(&self, frames: u32) -> String {
        match self {
            KenBurnsEffect::ZoomIn => {
                "z='min(zoom+0.0008,1.25)':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)'".to_string()
            }
            KenBurnsEffect::ZoomOut => {
                "z='if(lte(on,1),1.25,max(zoom-0.0008,1.0))':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)'"
                    .to_string()
            }
            KenBurnsEffect::PanUp => format!(
                "z='1.2':x='iw/2-(iw/zoom/2)':y='(ih-ih/zoom)*(1-on/{frames})'"
            ),
            KenBurnsEffect::PanDown => format!(
                "z='1.2':x='iw/2-(iw/zoom/2)':y='(ih-ih/zoom)*(on/{frames})'"
            ),
        }
    }
}

/// Render a still image into a Ken-Burns motion clip.
pub async fn ken_burns(
    image: impl AsRef<Path>,
    output: impl AsRef<Path>,
    effect: KenBurnsEffect,
    duration_seconds: f64,
    width: u32,
    height: u32,
    fps: u32,
) -> MediaResult<()> {
    let frames = (duration_seconds * f64::from(fps)).round().max(1.0) as u32;
    // Upscale past the output height so the zoom window never runs out of
    // pixels.
    let vf = format!(
        "scale=-2:{oversize},zoompan={expr}:d={frames}:s={width}x{height}:fps={fps},format=yuv420p",
        oversize = height + height / 3,
        expr = effect.zoompan_expr(frames),
    );

    debug!(effect = ?effect, duration_seconds, "rendering ken burns clip");

    let cmd = FfmpegCommand::new(output.as_ref())
        .input_with_args(["-loop", "1"], image.as_ref())
        .video_filter(vf)
        .duration(duration_seconds)
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .fps(fps);
    FfmpegRunner::new().run(&cmd).await
}

/// Strip characters that break drawtext expressions and escape the rest.
pub fn drawtext_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\'' | '"' | ':' | '\\' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Render a colored background clip with centered text.
pub async fn color_card(
    output: impl AsRef<Path>,
    title: &str,
    body: Option<&str>,
    color: &str,
    duration_seconds: f64,
    width: u32,
    height: u32,
    fps: u32,
) -> MediaResult<()> {
    let title = drawtext_safe(title);
    let mut filters = vec![format!(
        "drawtext=text='{title}':fontsize=64:fontcolor=white:x=(w-text_w)/2:y=(h/2)-80"
    )];
    if let Some(body) = body {
        let body = drawtext_safe(body);
        if !body.is_empty() {
            filters.push(format!(
                "drawtext=text='{body}':fontsize=36:fontcolor=white@0.8:x=(w-text_w)/2:y=(h/2)+20"
            ));
        }
    }

    let cmd = FfmpegCommand::new(output.as_ref())
        .lavfi(format!(
            "color=c={color}:s={width}x{height}:d={duration_seconds:.3}:r={fps}"
        ))
        .video_filter(filters.join(","))
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .duration(duration_seconds);
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_selection_is_deterministic() {
        assert_eq!(KenBurnsEffect::for_scene(1), KenBurnsEffect::ZoomOut);
        assert_eq!(KenBurnsEffect::for_scene(5), KenBurnsEffect::ZoomOut);
        assert_eq!(KenBurnsEffect::for_scene(2), KenBurnsEffect::PanUp);
        assert_eq!(KenBurnsEffect::for_scene(4), KenBurnsEffect::ZoomIn);
    }

    #[test]
    fn test_drawtext_safe_strips_quotes_and_colons() {
        assert_eq!(drawtext_safe("It's here: now"), "Its here now");
        assert_eq!(drawtext_safe("a \"b\" c"), "a b c");
    }

    #[test]
    fn test_pan_expressions_reference_frame_count() {
        let expr = KenBurnsEffect::PanUp.zoompan_expr(150);
        assert!(expr.contains("on/150"));
    }
}
