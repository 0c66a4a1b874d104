//! FFprobe wrapper.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Subprocess timeout for probes.
const PROBE_TIMEOUT_SECS: u64 = 30;

/// Probed media file information.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Container duration in seconds.
    pub duration_seconds: f64,
    /// Width of the first video stream, 0 if none.
    pub width: u32,
    /// Height of the first video stream, 0 if none.
    pub height: u32,
    /// Codec of the first video stream.
    pub codec: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Whether the file carries at least one video stream.
    pub has_video: bool,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a media file for duration, first video stream and size.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let child = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = tokio::time::timeout(
        Duration::from_secs(PROBE_TIMEOUT_SECS),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| MediaError::Timeout(PROBE_TIMEOUT_SECS))??;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "ffprobe exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

    let duration_seconds = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size_bytes = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(MediaInfo {
        duration_seconds,
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
        codec: video_stream
            .and_then(|s| s.codec_name.clone())
            .unwrap_or_default(),
        size_bytes,
        has_video: video_stream.is_some(),
    })
}

/// Duration of any media file (audio or video) in seconds.
pub async fn media_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let info = probe_media(path).await?;
    Ok(info.duration_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_media("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{
            "format": {"duration": "5.02", "size": "1048576"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920}
            ]
        }"#;
        let parsed: FfprobeOutput = serde_json::from_str(json).unwrap();
        let video = parsed.streams.iter().find(|s| s.codec_type == "video").unwrap();
        assert_eq!(video.width, Some(1080));
        assert_eq!(parsed.format.duration.as_deref(), Some("5.02"));
    }
}
