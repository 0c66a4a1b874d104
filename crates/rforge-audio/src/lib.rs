//! Audio manager: voice acquisition, mapping, alignment, music
//! preparation, ducking, mixing and normalization.
//!
//! A composable pipeline with well-defined stages. Every ffmpeg invocation
//! goes through the media facade; the timing math (mapping, duck regions,
//! alignment fallback) is pure and tested without subprocesses.

pub mod alignment;
pub mod ducking;
pub mod error;
pub mod mapper;
pub mod mixer;
pub mod music;
pub mod pipeline;
pub mod tts;
pub mod voice;

pub use alignment::{
    align_captions, even_time_split, AlignedCaption, Aligner, AlignmentMethod, AlignmentResult,
};
pub use ducking::{apply_ducking, detect_duck_regions, DUCK_AMOUNT_DB, DUCK_PAD_MS};
pub use error::{AudioError, AudioResult};
pub use mapper::{map_voice_to_scenes, VoiceMapping, VoiceSegment};
pub use mixer::{mix, normalize, LIMITER_DB, TARGET_LUFS, TRUE_PEAK_DB, VOICE_LEVEL_DB};
pub use music::{prepare_music, MUSIC_BASE_DBFS};
pub use pipeline::{build_audio_bed, AudioBedInputs};
pub use tts::{estimate_speech_seconds, generate_voiceover, TtsOutcome};
pub use voice::{ingest_voice, is_accepted_format, VoiceIngest, ACCEPTED_FORMATS};
