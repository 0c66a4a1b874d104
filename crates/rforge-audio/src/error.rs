//! Audio pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("TTS failed: {0}")]
    Tts(String),

    #[error("media error: {0}")]
    Media(#[from] rforge_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
