//! SRT subtitle export.

use std::path::Path;

use rforge_models::CaptionTrack;

/// Format milliseconds as an SRT timecode `HH:MM:SS,mmm`.
fn srt_timecode(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Render captions as an SRT document.
pub fn to_srt(captions: &[CaptionTrack]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (i, cap) in captions.iter().enumerate() {
        lines.push((i + 1).to_string());
        lines.push(format!(
            "{} --> {}",
            srt_timecode(cap.start),
            srt_timecode(cap.end)
        ));
        lines.push(cap.text.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Write captions to an SRT file.
pub async fn write_srt(captions: &[CaptionTrack], output: impl AsRef<Path>) -> std::io::Result<()> {
    let output = output.as_ref();
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(output, to_srt(captions)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(start: u64, end: u64, text: &str) -> CaptionTrack {
        CaptionTrack {
            text: text.to_string(),
            start,
            end,
            scene_id: None,
            style: None,
        }
    }

    #[test]
    fn test_timecode_format() {
        assert_eq!(srt_timecode(0), "00:00:00,000");
        assert_eq!(srt_timecode(2_500), "00:00:02,500");
        assert_eq!(srt_timecode(3_661_042), "01:01:01,042");
    }

    #[test]
    fn test_srt_document() {
        let srt = to_srt(&[cap(0, 2_000, "Hello world"), cap(2_500, 5_000, "Second")]);
        assert!(srt.contains("00:00:00,000 --> 00:00:02,000"));
        assert!(srt.contains("00:00:02,500 --> 00:00:05,000"));
        assert!(srt.starts_with("1\n"));
        assert!(srt.contains("\n2\n"));
        assert!(srt.contains("Hello world"));
    }

    #[tokio::test]
    async fn test_write_srt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        write_srt(&[cap(0, 1_000, "Hi")], &path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("00:00:00,000 --> 00:00:01,000"));
    }
}
