//! Scene composition — concatenation with xfade transitions.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::media_duration;

/// Transition kinds supported by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Hard cut, realized as a 1 ms xfade stand-in.
    Cut,
    Fade,
    FadeBlack,
    SwipeLeft,
    SwipeRight,
}

impl TransitionKind {
    fn xfade_name(&self) -> &'static str {
        match self {
            TransitionKind::Cut | TransitionKind::Fade => "fade",
            TransitionKind::FadeBlack => "fadeblack",
            TransitionKind::SwipeLeft => "slideleft",
            TransitionKind::SwipeRight => "slideright",
        }
    }
}

/// A transition between two consecutive clips.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub kind: TransitionKind,
    pub duration_ms: u64,
}

impl Transition {
    pub fn new(kind: TransitionKind, duration_ms: u64) -> Self {
        Self { kind, duration_ms }
    }

    fn duration_seconds(&self) -> f64 {
        match self.kind {
            // A zero-length xfade is rejected by ffmpeg; cuts use 1 ms.
            TransitionKind::Cut => 0.001,
            _ => (self.duration_ms.max(1) as f64) / 1000.0,
        }
    }
}

/// Aspect-preserving inside-fit + center-crop filter for one input label.
fn fit_filter(index: usize, width: u32, height: u32, fps: u32) -> String {
    format!(
        "[{index}:v]scale={width}:{height}:force_original_aspect_ratio=increase,\
crop={width}:{height},fps={fps},format=yuv420p,settb=AVTB[s{index}]"
    )
}

/// Re-encode a single clip to the target geometry.
pub async fn scale_fit(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
    fps: u32,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(input.as_ref())
        .video_filter(format!(
            "scale={width}:{height}:force_original_aspect_ratio=increase,\
crop={width}:{height},fps={fps}"
        ))
        .video_codec("libx264")
        .pixel_format("yuv420p");
    FfmpegRunner::new().run(&cmd).await
}

/// Compose scene clips in order with per-pair transitions.
///
/// `transitions[i]` is the transition out of `clips[i]`; the slice must have
/// `clips.len() - 1` entries (extra entries are ignored). Clip geometry is
/// normalized to `width`x`height` before the xfade chain so mixed-resolution
/// inputs compose cleanly.
pub async fn compose_scenes(
    clips: &[PathBuf],
    transitions: &[Transition],
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
    fps: u32,
) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(MediaError::NoInputs);
    }
    let output = output.as_ref();
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if clips.len() == 1 {
        return scale_fit(&clips[0], output, width, height, fps).await;
    }

    let mut durations = Vec::with_capacity(clips.len());
    for clip in clips {
        durations.push(media_duration(clip).await?);
    }

    let mut filter_parts: Vec<String> = Vec::new();
    for i in 0..clips.len() {
        filter_parts.push(fit_filter(i, width, height, fps));
    }

    // Chain xfades: each transition's offset is the accumulated content
    // length before it, minus the fade itself.
    let mut cumulative = durations[0];
    for i in 1..clips.len() {
        let transition = transitions
            .get(i - 1)
            .copied()
            .unwrap_or(Transition::new(TransitionKind::Fade, 500));
        let fade_s = transition.duration_seconds();
        let offset = (cumulative - fade_s).max(0.0);

        let prev = if i == 1 {
            "[s0]".to_string()
        } else {
            format!("[x{}]", i - 1)
        };
        let next = format!("[s{i}]");
        let out_label = if i == clips.len() - 1 {
            "[outv]".to_string()
        } else {
            format!("[x{i}]")
        };

        filter_parts.push(format!(
            "{prev}{next}xfade=transition={}:duration={fade_s:.3}:offset={offset:.3}{out_label}",
            transition.kind.xfade_name(),
        ));

        cumulative = offset + durations[i];
    }

    let mut cmd = FfmpegCommand::new(output);
    for clip in clips {
        cmd = cmd.input(clip);
    }
    let cmd = cmd
        .filter_complex(filter_parts.join(";"))
        .map("[outv]")
        .video_codec("libx264")
        .pixel_format("yuv420p");

    FfmpegRunner::new().run(&cmd).await?;

    info!(
        clips = clips.len(),
        output = %output.display(),
        "composed scene clips"
    );
    Ok(())
}

/// Final export: normalize geometry, frame rate, codecs and bitrate cap,
/// with the moov atom up front.
pub async fn export_final(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
    fps: u32,
    max_bitrate: &str,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(output.as_ref())
        .input(input.as_ref())
        .video_codec("libx264")
        .pixel_format("yuv420p")
        .fps(fps)
        .arg("-s")
        .arg(format!("{width}x{height}"))
        .arg("-maxrate")
        .arg(max_bitrate)
        .arg("-bufsize")
        .arg(max_bitrate)
        .audio_codec("aac")
        .arg("-b:a")
        .arg("192k")
        .faststart();
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_uses_millisecond_standin() {
        let t = Transition::new(TransitionKind::Cut, 500);
        assert!((t.duration_seconds() - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_fade_duration_from_ms() {
        let t = Transition::new(TransitionKind::Fade, 500);
        assert!((t.duration_seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_xfade_names() {
        assert_eq!(TransitionKind::FadeBlack.xfade_name(), "fadeblack");
        assert_eq!(TransitionKind::SwipeLeft.xfade_name(), "slideleft");
        assert_eq!(TransitionKind::SwipeRight.xfade_name(), "slideright");
    }

    #[test]
    fn test_fit_filter_shape() {
        let f = fit_filter(2, 1080, 1920, 30);
        assert!(f.starts_with("[2:v]scale=1080:1920"));
        assert!(f.ends_with("[s2]"));
    }

    #[tokio::test]
    async fn test_compose_rejects_empty_input() {
        let err = compose_scenes(&[], &[], "/tmp/out.mp4", 1080, 1920, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NoInputs));
    }
}
