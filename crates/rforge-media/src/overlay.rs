//! Image overlay and watermark burn-in.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Overlay anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayAnchor {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl OverlayAnchor {
    fn position_expr(&self, margin: u32) -> String {
        match self {
            OverlayAnchor::Center => "x=(W-w)/2:y=(H-h)/2".to_string(),
            OverlayAnchor::TopLeft => format!("x={margin}:y={margin}"),
            OverlayAnchor::TopRight => format!("x=W-w-{margin}:y={margin}"),
            OverlayAnchor::BottomLeft => format!("x={margin}:y=H-h-{margin}"),
            OverlayAnchor::BottomRight => format!("x=W-w-{margin}:y=H-h-{margin}"),
        }
    }
}

/// How an image is placed over a video.
#[derive(Debug, Clone)]
pub struct OverlaySpec {
    pub anchor: OverlayAnchor,
    /// Overlay width in pixels; height follows the aspect ratio.
    pub width_px: u32,
    /// Alpha applied to the overlay, in [0, 1].
    pub opacity: f64,
    /// Edge margin in pixels for corner anchors.
    pub margin: u32,
}

impl Default for OverlaySpec {
    fn default() -> Self {
        Self {
            anchor: OverlayAnchor::Center,
            width_px: 600,
            opacity: 1.0,
            margin: 30,
        }
    }
}

impl OverlaySpec {
    /// Corner watermark defaults: small, semi-transparent, top-right.
    pub fn watermark() -> Self {
        Self {
            anchor: OverlayAnchor::TopRight,
            width_px: 120,
            opacity: 0.6,
            margin: 30,
        }
    }
}

/// Overlay a PNG (with alpha) on a video.
pub async fn overlay_image(
    video: impl AsRef<Path>,
    image: impl AsRef<Path>,
    output: impl AsRef<Path>,
    spec: &OverlaySpec,
) -> MediaResult<()> {
    let fc = format!(
        "[1:v]scale={width}:-1,format=rgba,colorchannelmixer=aa={opacity:.3}[ovr];\
[0:v][ovr]overlay={pos}:format=auto[out]",
        width = spec.width_px.max(1),
        opacity = spec.opacity.clamp(0.0, 1.0),
        pos = spec.anchor.position_expr(spec.margin),
    );

    let cmd = FfmpegCommand::new(output.as_ref())
        .input(video.as_ref())
        .input(image.as_ref())
        .filter_complex(fc)
        .map("[out]")
        .map("0:a?")
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .audio_codec("copy");
    FfmpegRunner::new().run(&cmd).await
}
