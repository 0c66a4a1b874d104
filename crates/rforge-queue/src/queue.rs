//! Backend-dispatched queue interface.

use std::time::Duration;

use crate::error::QueueResult;
use crate::job::QueuedJob;
use crate::memory::MemoryQueue;
use crate::redis_queue::RedisQueue;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL; empty selects the in-memory backend.
    pub redis_url: String,
    /// List key holding queued jobs.
    pub list_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            list_key: "rforge:jobs".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            list_key: std::env::var("QUEUE_LIST_KEY")
                .unwrap_or_else(|_| "rforge:jobs".to_string()),
        }
    }
}

/// FIFO of job ids. The queue hands each job to exactly one consumer.
#[derive(Debug, Clone)]
pub enum JobQueue {
    Redis(RedisQueue),
    Memory(MemoryQueue),
}

impl JobQueue {
    /// Open a Redis-backed queue.
    pub fn redis(config: QueueConfig) -> QueueResult<Self> {
        Ok(JobQueue::Redis(RedisQueue::new(config)?))
    }

    /// Open an in-memory queue.
    pub fn memory() -> Self {
        JobQueue::Memory(MemoryQueue::new())
    }

    /// Append a job to the tail of the queue.
    pub async fn enqueue(&self, job: &QueuedJob) -> QueueResult<()> {
        match self {
            JobQueue::Redis(q) => q.enqueue(job).await,
            JobQueue::Memory(q) => q.enqueue(job).await,
        }
    }

    /// Pop the head, blocking up to `timeout`; `Ok(None)` on timeout.
    pub async fn pop_blocking(&self, timeout: Duration) -> QueueResult<Option<QueuedJob>> {
        match self {
            JobQueue::Redis(q) => q.pop_blocking(timeout).await,
            JobQueue::Memory(q) => q.pop_blocking(timeout).await,
        }
    }

    /// Pop the head without blocking.
    pub async fn pop_now(&self) -> QueueResult<Option<QueuedJob>> {
        match self {
            JobQueue::Redis(q) => q.pop_now().await,
            JobQueue::Memory(q) => q.pop_now().await,
        }
    }

    /// Number of queued jobs.
    pub async fn depth(&self) -> QueueResult<u64> {
        match self {
            JobQueue::Redis(q) => q.depth().await,
            JobQueue::Memory(q) => q.depth().await,
        }
    }
}
