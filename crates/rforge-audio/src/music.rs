//! Background music preparation.
//!
//! Fits a music source to the video duration: trim with a fade-out when
//! longer, loop via stream repetition when shorter. Output sits at a
//! −12 dBFS baseline, 44.1 kHz stereo.

use std::path::Path;
use tracing::info;

use rforge_media::{apply_audio_filter, audio_duration, db_to_gain, loop_audio_filter};

use crate::error::{AudioError, AudioResult};

/// Baseline music level, dBFS.
pub const MUSIC_BASE_DBFS: f64 = -12.0;

/// Fade-out applied at the end of the fitted track, seconds.
const FADE_OUT_S: f64 = 2.0;

/// Fit a music source to `target_duration_seconds`.
pub async fn prepare_music(
    source: &Path,
    output: &Path,
    target_duration_seconds: f64,
) -> AudioResult<()> {
    if !source.exists() {
        return Err(AudioError::FileNotFound(source.to_path_buf()));
    }

    let source_duration = audio_duration(source).await?;
    let gain = db_to_gain(MUSIC_BASE_DBFS);
    let fade_start = (target_duration_seconds - FADE_OUT_S).max(0.0);

    if source_duration >= target_duration_seconds {
        let filter = format!(
            "volume={gain:.4},afade=t=out:st={fade_start:.3}:d={FADE_OUT_S}"
        );
        apply_audio_filter(source, output, &filter, Some(target_duration_seconds)).await?;
    } else {
        let loops = (target_duration_seconds / source_duration.max(0.1)).ceil() as u32;
        let filter = format!(
            "volume={gain:.4},afade=t=in:d=0.2,afade=t=out:st={fade_start:.3}:d={FADE_OUT_S}"
        );
        loop_audio_filter(source, output, loops, &filter, target_duration_seconds).await?;
    }

    info!(
        source = %source.display(),
        source_duration,
        target = target_duration_seconds,
        method = if source_duration >= target_duration_seconds { "trim" } else { "loop" },
        "music prepared"
    );
    Ok(())
}
