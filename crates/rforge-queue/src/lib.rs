//! Job queue for the render engine.
//!
//! A FIFO of job ids with blocking and non-blocking pop. Two backends share
//! one enum-dispatched interface: a Redis list (production, hands each job
//! to exactly one consumer) and an in-memory queue (tests and single-process
//! local mode).

pub mod error;
pub mod job;
pub mod memory;
pub mod queue;
pub mod redis_queue;

pub use error::{QueueError, QueueResult};
pub use job::QueuedJob;
pub use memory::MemoryQueue;
pub use queue::{JobQueue, QueueConfig};
pub use redis_queue::RedisQueue;
