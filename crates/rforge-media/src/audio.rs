//! Audio primitives: mixing, filtering, normalization, muxing, silence.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

pub use crate::probe::media_duration as audio_duration;

/// Convert dB to a linear gain multiplier.
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Options for [`mix_tracks`].
#[derive(Debug, Clone)]
pub struct MixOptions {
    /// Voice level in dBFS.
    pub voice_level_db: f64,
    /// Brick-wall limiter ceiling in dBFS.
    pub limiter_db: f64,
    /// Clamp the mixed output to this duration, seconds.
    pub target_duration_seconds: Option<f64>,
}

impl Default for MixOptions {
    fn default() -> Self {
        Self {
            voice_level_db: -6.0,
            limiter_db: -1.0,
            target_duration_seconds: None,
        }
    }
}

/// Mix a voice track and/or a (pre-ducked, pre-leveled) music track into a
/// 44.1 kHz stereo WAV. At least one input is required; the output covers
/// the longer of the two.
pub async fn mix_tracks(
    voice: Option<&Path>,
    music: Option<&Path>,
    output: impl AsRef<Path>,
    options: &MixOptions,
) -> MediaResult<()> {
    let output = output.as_ref();
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let voice_gain = db_to_gain(options.voice_level_db);
    let limit = db_to_gain(options.limiter_db);

    let cmd = match (voice, music) {
        (Some(voice), Some(music)) => {
            let fc = format!(
                "[0:a]volume={voice_gain:.4}[v];\
[v][1:a]amix=inputs=2:duration=longest:dropout_transition=0.05,\
alimiter=limit={limit:.4}[out]"
            );
            let mut cmd = FfmpegCommand::new(output)
                .input(voice)
                .input(music)
                .filter_complex(fc)
                .map("[out]");
            if let Some(t) = options.target_duration_seconds {
                cmd = cmd.duration(t);
            }
            cmd
        }
        (Some(voice), None) => FfmpegCommand::new(output).input(voice).audio_filter(format!(
            "volume={voice_gain:.4},alimiter=limit={limit:.4}"
        )),
        (None, Some(music)) => FfmpegCommand::new(output).input(music).audio_filter("anull"),
        (None, None) => return Err(MediaError::NoInputs),
    };

    let cmd = cmd
        .arg("-ar")
        .arg("44100")
        .arg("-ac")
        .arg("2")
        .audio_codec("pcm_s16le");
    FfmpegRunner::new().run(&cmd).await?;

    info!(
        voice = voice.is_some(),
        music = music.is_some(),
        output = %output.display(),
        "mixed audio tracks"
    );
    Ok(())
}

/// Apply an audio filter chain to one input, writing 44.1 kHz stereo PCM.
pub async fn apply_audio_filter(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    filter: &str,
    clamp_seconds: Option<f64>,
) -> MediaResult<()> {
    let mut cmd = FfmpegCommand::new(output.as_ref()).input(input.as_ref());
    if let Some(t) = clamp_seconds {
        cmd = cmd.duration(t);
    }
    let cmd = cmd
        .audio_filter(filter)
        .arg("-ar")
        .arg("44100")
        .arg("-ac")
        .arg("2")
        .audio_codec("pcm_s16le");
    FfmpegRunner::new().run(&cmd).await
}

/// Loop an audio source `loops` extra times, then filter and clamp.
pub async fn loop_audio_filter(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    loops: u32,
    filter: &str,
    clamp_seconds: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input_with_args(["-stream_loop".to_string(), loops.to_string()], input.as_ref())
        .duration(clamp_seconds)
        .audio_filter(filter)
        .arg("-ar")
        .arg("44100")
        .arg("-ac")
        .arg("2")
        .audio_codec("pcm_s16le");
    FfmpegRunner::new().run(&cmd).await
}

/// EBU R128 loudness normalization of a video's audio stream.
pub async fn loudness_normalize(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    target_lufs: f64,
    true_peak_db: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(input.as_ref())
        .audio_filter(format!(
            "loudnorm=I={target_lufs}:TP={true_peak_db}:LRA=11"
        ))
        .video_codec("copy")
        .audio_codec("aac")
        .arg("-b:a")
        .arg("192k");
    FfmpegRunner::new().run(&cmd).await
}

/// Mux a mixed audio track onto a video, replacing any existing audio.
pub async fn mux_audio(
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(video.as_ref())
        .input(audio.as_ref())
        .map("0:v:0")
        .map("1:a:0")
        .video_codec("copy")
        .audio_codec("aac")
        .arg("-b:a")
        .arg("192k")
        .arg("-shortest");
    FfmpegRunner::new().run(&cmd).await
}

/// Generate a silent 44.1 kHz stereo track.
pub async fn silence_track(
    output: impl AsRef<Path>,
    duration_seconds: f64,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .lavfi(format!(
            "anullsrc=r=44100:cl=stereo:d={duration_seconds:.3}"
        ))
        .audio_codec("pcm_s16le");
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-9);
        assert!((db_to_gain(-6.0) - 0.5011).abs() < 1e-3);
        assert!((db_to_gain(-12.0) - 0.2511).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_mix_requires_an_input() {
        let err = mix_tracks(None, None, "/tmp/mix.wav", &MixOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoInputs));
    }
}
