//! Thumbnail extraction.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Extract a single frame as a JPEG thumbnail.
pub async fn extract_thumbnail(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
    timestamp_seconds: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(video.as_ref())
        .seek(timestamp_seconds)
        .single_frame()
        .arg("-q:v")
        .arg("2");
    FfmpegRunner::new().with_timeout(60).run(&cmd).await
}
