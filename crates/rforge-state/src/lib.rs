//! Durable state store for Job and Scene records.
//!
//! Records are JSON documents, one file per record, written atomically
//! (temp file + rename). The repositories are the only synchronization
//! point in the system: the runner and the engine manager both update
//! records through them, one short write per transition.

pub mod docs;
pub mod error;
pub mod job_repo;
pub mod scene_repo;

pub use docs::DocumentStore;
pub use error::{StateError, StateResult};
pub use job_repo::{JobRepository, JobUpdate};
pub use scene_repo::{SceneRepository, SceneUpdate};
