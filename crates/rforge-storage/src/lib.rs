//! Blob storage for the render engine.
//!
//! A key→bytes file store rooted at a single directory, with `file://` URI
//! mapping. URIs persisted in the state store are opaque to the runtime;
//! only this crate translates between keys, URIs and local paths.

pub mod error;
pub mod layout;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use layout::{upload_key, JobKeys};
pub use store::LocalStore;
