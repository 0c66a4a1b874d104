//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving ffmpeg/ffprobe.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("ffmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("not a valid media file: {0}")]
    InvalidMedia(String),

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("no inputs supplied")]
    NoInputs,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an ffmpeg failure error with captured stderr.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an ffprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }
}
