//! The render worker: dequeues jobs and drives each through the job state
//! machine — planning, timeline, scene fan-out, assembly — with crash
//! resume and a template fallback that guarantees a playable output.

pub mod assembler;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;
pub mod runner;
pub mod template;

pub use assembler::{
    Assembler, FinalArtifacts, RenderMetadata, SceneClipMetadata, VoiceAssets,
};
pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::{WorkerError, WorkerResult};
pub use executor::Executor;
pub use logging::JobLogger;
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use runner::run_job;
pub use template::generate_template_video;
