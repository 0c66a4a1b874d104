//! Typed ffmpeg/ffprobe facade.
//!
//! Every media operation in the engine goes through this crate: probing,
//! scene composition with transitions, Ken-Burns synthesis, color cards,
//! overlays, caption burn-in, audio mixing/ducking/normalization, muxing
//! and thumbnails. Each primitive is a single subprocess invocation; errors
//! surface as [`MediaError`] with captured stderr.

pub mod audio;
pub mod captions;
pub mod command;
pub mod compose;
pub mod error;
pub mod overlay;
pub mod probe;
pub mod synth;
pub mod thumbnail;

pub use audio::{
    apply_audio_filter, audio_duration, db_to_gain, loop_audio_filter, loudness_normalize,
    mix_tracks, mux_audio, silence_track, MixOptions,
};
pub use captions::{burn_captions, BurnCaption, BurnStyle};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{compose_scenes, export_final, scale_fit, Transition, TransitionKind};
pub use error::{MediaError, MediaResult};
pub use overlay::{overlay_image, OverlayAnchor, OverlaySpec};
pub use probe::{media_duration, probe_media, MediaInfo};
pub use synth::{color_card, drawtext_safe, ken_burns, KenBurnsEffect};
pub use thumbnail::extract_thumbnail;
