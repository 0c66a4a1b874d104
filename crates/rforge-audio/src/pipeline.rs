//! The audio bed builder: music fit → ducking → mix.
//!
//! Produces the single mixed track that gets muxed onto the composed
//! video. With neither voice nor music, a silent stereo track matching the
//! total duration is synthesized so the mux stage always has an input.

use std::path::{Path, PathBuf};
use tracing::info;

use rforge_media::silence_track;

use crate::ducking::{apply_ducking, detect_duck_regions, DUCK_AMOUNT_DB};
use crate::error::AudioResult;
use crate::mixer;
use crate::music::prepare_music;

/// Inputs to one audio bed build.
#[derive(Debug)]
pub struct AudioBedInputs<'a> {
    /// Processed voiceover, if any.
    pub voice: Option<&'a Path>,
    /// Music source file, if any.
    pub music_source: Option<&'a Path>,
    /// Voice-active spans in ms, used to construct duck regions.
    pub voice_spans_ms: Vec<(u64, u64)>,
    /// Total video duration in seconds.
    pub total_duration_seconds: f64,
    /// Directory for intermediates.
    pub work_dir: &'a Path,
}

/// Build the mixed audio bed and return its path.
pub async fn build_audio_bed(inputs: &AudioBedInputs<'_>) -> AudioResult<PathBuf> {
    tokio::fs::create_dir_all(inputs.work_dir).await?;
    let mixed = inputs.work_dir.join("mix.wav");

    let music = match inputs.music_source {
        Some(source) => {
            let prepared = inputs.work_dir.join("music_prepared.wav");
            prepare_music(source, &prepared, inputs.total_duration_seconds).await?;

            if inputs.voice.is_some() && !inputs.voice_spans_ms.is_empty() {
                let ducked = inputs.work_dir.join("music_ducked.wav");
                let regions = detect_duck_regions(&inputs.voice_spans_ms, DUCK_AMOUNT_DB);
                apply_ducking(&prepared, &ducked, &regions).await?;
                Some(ducked)
            } else {
                Some(prepared)
            }
        }
        None => None,
    };

    match (inputs.voice, music.as_deref()) {
        (None, None) => {
            silence_track(&mixed, inputs.total_duration_seconds).await?;
            info!("no voice or music, synthesized silent bed");
        }
        (voice, music) => {
            mixer::mix(voice, music, &mixed).await?;
        }
    }

    Ok(mixed)
}
