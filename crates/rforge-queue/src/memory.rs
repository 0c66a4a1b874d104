//! In-memory queue backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::error::QueueResult;
use crate::job::QueuedJob;

/// Process-local FIFO used in tests and single-process local mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    items: Mutex<VecDeque<QueuedJob>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, job: &QueuedJob) -> QueueResult<()> {
        self.inner.items.lock().await.push_back(job.clone());
        self.inner.notify.notify_one();
        Ok(())
    }

    pub async fn pop_blocking(&self, timeout: Duration) -> QueueResult<Option<QueuedJob>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(job) = self.inner.items.lock().await.pop_front() {
                return Ok(Some(job));
            }
            // Wait for a producer or the deadline, then re-check; a wake-up
            // does not guarantee the item is still there.
            let notified = self.inner.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(self.inner.items.lock().await.pop_front());
            }
        }
    }

    pub async fn pop_now(&self) -> QueueResult<Option<QueuedJob>> {
        Ok(self.inner.items.lock().await.pop_front())
    }

    pub async fn depth(&self) -> QueueResult<u64> {
        Ok(self.inner.items.lock().await.len() as u64)
    }
}
