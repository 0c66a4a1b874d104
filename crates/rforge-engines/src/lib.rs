//! Scene render fabric: engine adapters, fallback chain and fan-out.
//!
//! The [`EngineManager`] converts scenes into playable clips. Per scene it
//! selects an engine, builds and sanitizes a prompt, then walks a
//! three-level fallback chain — primary engine (with one moderation
//! rephrase retry), alternate engines, deterministic local renderer — under
//! a bounded-concurrency fan-out. External providers implement one
//! [`EngineAdapter`] capability and never raise past their boundary.

pub mod adapter;
pub mod local;
pub mod luma;
pub mod manager;
pub mod pika;
pub mod prompt;
pub mod rotation;
pub mod runway;
pub mod selector;
pub mod validator;

pub use adapter::{EngineAdapter, EngineFailure, GeneratedClip, GenerateRequest, StyleHints};
pub use local::LocalRenderer;
pub use luma::LumaEngine;
pub use manager::{EngineManager, RenderOptions, SceneRenderResult};
pub use pika::PikaEngine;
pub use prompt::{build_prompt, moderation_blocked, rephrase_for_moderation, sanitize_prompt};
pub use rotation::FailureTracker;
pub use runway::RunwayEngine;
pub use selector::{select_engine_for_scene, EngineAssignment, SelectorOptions};
pub use validator::{
    validate_clip, ClipValidator, ProbeValidator, ValidationLimits, ValidationResult,
};
