//! Timed caption burn-in primitive.
//!
//! Takes pre-wrapped caption lines with resolved styling and renders them
//! as drawtext filters with fade-in/out alpha ramps. Style resolution and
//! line wrapping live upstream; this module only talks to ffmpeg.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// One caption to burn. `text` may contain embedded newlines for wrapped
/// lines.
#[derive(Debug, Clone)]
pub struct BurnCaption {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Resolved drawtext styling.
#[derive(Debug, Clone)]
pub struct BurnStyle {
    pub font_family: String,
    pub font_size: u32,
    pub font_color: String,
    pub outline_color: String,
    pub outline_width: u32,
    pub box_color: String,
    pub box_opacity: f64,
    /// drawtext x expression.
    pub x_expr: String,
    /// drawtext y expression.
    pub y_expr: String,
    /// Ease in/out length at the caption boundaries, seconds.
    pub fade_seconds: f64,
}

impl Default for BurnStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 48,
            font_color: "white".to_string(),
            outline_color: "black".to_string(),
            outline_width: 2,
            box_color: "black".to_string(),
            box_opacity: 0.5,
            x_expr: "(w-text_w)/2".to_string(),
            y_expr: "h-150-text_h".to_string(),
            fade_seconds: 0.2,
        }
    }
}

/// Escape caption text for a drawtext expression, preserving newlines.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

fn drawtext_filter(cap: &BurnCaption, style: &BurnStyle) -> String {
    let text = escape_text(&cap.text);
    let (start, end) = (cap.start_seconds, cap.end_seconds);

    let mut parts = vec![
        format!("drawtext=text='{text}'"),
        format!("fontsize={}", style.font_size),
        format!("fontcolor={}", style.font_color),
        format!("font={}", style.font_family),
        format!("x={}", style.x_expr),
        format!("y={}", style.y_expr),
        format!("borderw={}", style.outline_width),
        format!("bordercolor={}", style.outline_color),
        "box=1".to_string(),
        format!("boxcolor={}@{:.2}", style.box_color, style.box_opacity),
        "boxborderw=14".to_string(),
    ];

    if style.fade_seconds > 0.0 && end - start > 2.0 * style.fade_seconds {
        let fd = style.fade_seconds;
        // Linear alpha ramp in over [start, start+fd] and out over
        // [end-fd, end].
        let alpha = format!(
            "if(lt(t,{start:.3}),0,if(lt(t,{fade_in:.3}),(t-{start:.3})/{fd:.3},\
if(lt(t,{fade_out:.3}),1,if(lt(t,{end:.3}),({end:.3}-t)/{fd:.3},0))))",
            fade_in = start + fd,
            fade_out = end - fd,
        );
        parts.push(format!("alpha='{alpha}'"));
    }
    parts.push(format!("enable='between(t,{start:.3},{end:.3})'"));

    parts.join(":")
}

/// Burn captions onto a video. With no captions the input is copied.
pub async fn burn_captions(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    captions: &[BurnCaption],
    style: &BurnStyle,
) -> MediaResult<()> {
    let video = video.as_ref();
    let output = output.as_ref();

    let filters: Vec<String> = captions
        .iter()
        .filter(|c| !c.text.is_empty() && c.end_seconds > c.start_seconds)
        .map(|c| drawtext_filter(c, style))
        .collect();

    if filters.is_empty() {
        let cmd = FfmpegCommand::new(output).input(video).arg("-c").arg("copy");
        return FfmpegRunner::new().run(&cmd).await;
    }

    let vf = filters.join(",");
    let cmd = FfmpegCommand::new(output)
        .input(video)
        .video_filter(vf)
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .map("0:a?")
        .audio_codec("copy");
    FfmpegRunner::new().run(&cmd).await?;

    info!(count = captions.len(), "burned captions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_preserves_newlines() {
        let escaped = escape_text("line one\nline: two");
        assert!(escaped.contains('\n'));
        assert!(escaped.contains("\\:"));
    }

    #[test]
    fn test_filter_contains_fade_alpha() {
        let cap = BurnCaption {
            text: "Hello world".into(),
            start_seconds: 1.0,
            end_seconds: 4.0,
        };
        let filter = drawtext_filter(&cap, &BurnStyle::default());
        assert!(filter.contains("alpha='"));
        assert!(filter.contains("enable='between(t,1.000,4.000)'"));
    }

    #[test]
    fn test_short_caption_skips_fade() {
        let cap = BurnCaption {
            text: "Hi".into(),
            start_seconds: 0.0,
            end_seconds: 0.3,
        };
        let filter = drawtext_filter(&cap, &BurnStyle::default());
        assert!(!filter.contains("alpha='"));
    }
}
