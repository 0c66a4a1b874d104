//! Redis list-backed queue.

use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::QueueResult;
use crate::job::QueuedJob;
use crate::queue::QueueConfig;

/// FIFO over a Redis list: LPUSH at the tail, BRPOP at the head.
#[derive(Debug, Clone)]
pub struct RedisQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub async fn enqueue(&self, job: &QueuedJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(&self.config.list_key, payload).await?;
        info!(job_id = %job.job_id, "enqueued job");
        Ok(())
    }

    pub async fn pop_blocking(&self, timeout: Duration) -> QueueResult<Option<QueuedJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<(String, String)> = conn
            .brpop(&self.config.list_key, timeout.as_secs_f64())
            .await?;
        match result {
            Some((_, payload)) => {
                let job: QueuedJob = serde_json::from_str(&payload)?;
                debug!(job_id = %job.job_id, "dequeued job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    pub async fn pop_now(&self) -> QueueResult<Option<QueuedJob>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.rpop(&self.config.list_key, None).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn depth(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.llen(&self.config.list_key).await?;
        Ok(len)
    }
}
