//! Caption renderer: style resolution, safe-zone wrapping, timed burn-in
//! and subtitle export.

pub mod srt;
pub mod style;
pub mod wrap;

use std::path::Path;
use tracing::info;

use rforge_media::{burn_captions, BurnCaption, BurnStyle, MediaResult};
use rforge_models::CaptionTrack;

pub use srt::{to_srt, write_srt};
pub use style::{resolve_style, CaptionStyle, BRAND_SAFE_MIN_FONT_PX};
pub use wrap::{wrap_caption, MAX_LINES, SAFE_BOTTOM, SAFE_LEFT, SAFE_RIGHT, SAFE_TOP};

/// Burn a timeline's caption track onto a video.
///
/// Each caption is wrapped for the safe zone, then rendered with a 0.2 s
/// fade at its boundaries.
pub async fn render_captions(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    captions: &[CaptionTrack],
    style: &CaptionStyle,
    frame_width: u32,
) -> MediaResult<()> {
    let burns: Vec<BurnCaption> = captions
        .iter()
        .filter(|c| !c.text.is_empty() && c.end > c.start)
        .map(|c| BurnCaption {
            text: wrap_caption(&c.text, style.font_size, frame_width),
            start_seconds: c.start as f64 / 1000.0,
            end_seconds: c.end as f64 / 1000.0,
        })
        .collect();

    let burn_style: BurnStyle = style.to_burn_style();
    burn_captions(video, output, &burns, &burn_style).await?;

    info!(count = burns.len(), "captions rendered");
    Ok(())
}
