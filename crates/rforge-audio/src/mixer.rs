//! Final mixing, normalization and muxing levels.

use std::path::Path;

use rforge_media::{loudness_normalize, mix_tracks, mux_audio, MixOptions};

use crate::error::AudioResult;

/// Voice level in the mix, dBFS.
pub const VOICE_LEVEL_DB: f64 = -6.0;

/// Brick-wall limiter ceiling, dBFS.
pub const LIMITER_DB: f64 = -1.0;

/// Loudness normalization target, LUFS.
pub const TARGET_LUFS: f64 = -14.0;

/// True-peak ceiling for normalization, dB.
pub const TRUE_PEAK_DB: f64 = -1.5;

/// Mix voice and ducked music; the output covers the longer of the two.
pub async fn mix(
    voice: Option<&Path>,
    music: Option<&Path>,
    output: &Path,
) -> AudioResult<()> {
    mix_tracks(
        voice,
        music,
        output,
        &MixOptions {
            voice_level_db: VOICE_LEVEL_DB,
            limiter_db: LIMITER_DB,
            target_duration_seconds: None,
        },
    )
    .await?;
    Ok(())
}

/// Normalize a muxed video's audio to the EBU R128 target.
pub async fn normalize(input: &Path, output: &Path) -> AudioResult<()> {
    loudness_normalize(input, output, TARGET_LUFS, TRUE_PEAK_DB).await?;
    Ok(())
}

/// Mux a mixed track onto a video, replacing existing audio.
pub async fn mux(video: &Path, audio: &Path, output: &Path) -> AudioResult<()> {
    mux_audio(video, audio, output).await?;
    Ok(())
}
