//! User-provided voiceover ingestion.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use rforge_media::{apply_audio_filter, audio_duration};

use crate::error::{AudioError, AudioResult};

/// Audio container formats accepted for upload.
pub const ACCEPTED_FORMATS: &[&str] = &["wav", "mp3", "aac", "m4a", "ogg", "flac"];

/// Silence threshold for lead/tail trimming, dBFS.
const SILENCE_THRESHOLD_DB: i32 = -40;

/// A processed voiceover ready for the pipeline.
#[derive(Debug, Clone)]
pub struct VoiceIngest {
    pub audio_path: PathBuf,
    pub duration_ms: u64,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Whether a filename carries an accepted audio extension.
pub fn is_accepted_format(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| ACCEPTED_FORMATS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Ingest a user-provided voice file:
/// resample to 44.1 kHz stereo, trim leading/trailing silence below
/// −40 dBFS, measure, and trim with a 0.5 s fade-out when over
/// `max_duration_ms`.
pub async fn ingest_voice(
    input: &Path,
    output_dir: &Path,
    max_duration_ms: Option<u64>,
) -> AudioResult<VoiceIngest> {
    if !input.exists() {
        return Err(AudioError::FileNotFound(input.to_path_buf()));
    }
    if !is_accepted_format(input) {
        return Err(AudioError::UnsupportedFormat(
            extension_of(input).unwrap_or_else(|| "<none>".to_string()),
        ));
    }
    tokio::fs::create_dir_all(output_dir).await?;

    let processed = output_dir.join("voiceover_processed.wav");
    let trim = format!(
        "silenceremove=start_periods=1:start_silence=0.1:start_threshold={SILENCE_THRESHOLD_DB}dB"
    );
    // Trim the tail by reversing, trimming the head, and reversing back.
    let filter = format!("aresample=44100,{trim},areverse,{trim},areverse");
    apply_audio_filter(input, &processed, &filter, None).await?;

    let mut audio_path = processed;
    let mut duration_ms = (audio_duration(&audio_path).await? * 1000.0) as u64;

    if let Some(max_ms) = max_duration_ms {
        if duration_ms > max_ms {
            let trimmed = output_dir.join("voiceover_trimmed.wav");
            let max_seconds = max_ms as f64 / 1000.0;
            let fade_start = (max_seconds - 0.5).max(0.0);
            apply_audio_filter(
                &audio_path,
                &trimmed,
                &format!("afade=t=out:st={fade_start:.3}:d=0.5"),
                Some(max_seconds),
            )
            .await?;
            warn!(original_ms = duration_ms, trimmed_to_ms = max_ms, "voiceover trimmed");
            audio_path = trimmed;
            duration_ms = max_ms;
        }
    }

    info!(duration_ms, "voiceover ingested");
    Ok(VoiceIngest {
        audio_path,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_formats() {
        assert!(is_accepted_format(Path::new("v.wav")));
        assert!(is_accepted_format(Path::new("v.MP3")));
        assert!(is_accepted_format(Path::new("v.flac")));
        assert!(!is_accepted_format(Path::new("v.txt")));
        assert!(!is_accepted_format(Path::new("v")));
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let err = ingest_voice(Path::new("/nonexistent/v.wav"), Path::new("/tmp"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let err = ingest_voice(&path, dir.path(), None).await.unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat(_)));
    }
}
