//! The dequeue loop: one job at a time per worker, with resume on start
//! and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use rforge_models::JobId;

use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::retry::{retry_async, RetryConfig};
use crate::runner::run_job;

/// Sequential job executor.
pub struct Executor {
    ctx: Arc<WorkerContext>,
    shutdown: watch::Sender<bool>,
}

impl Executor {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { ctx, shutdown }
    }

    /// Signal shutdown: the dequeue loop stops after the current job; the
    /// running scene dispatch observes the flag at its next suspension.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// A receiver for the shutdown flag.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Run the executor until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!("worker started");
        self.ctx.engines.log_health().await;

        self.resume_interrupted().await;

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let popped = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                popped = self.pop_with_retry() => popped,
            };

            let Some(queued) = popped else { continue };
            let job_id = JobId::from_string(queued.job_id);
            info!(job_id = %job_id, "job dequeued");

            if let Err(e) = run_job(&self.ctx, &job_id, self.shutdown.subscribe()).await {
                error!(job_id = %job_id, error = %e, "job run failed");
            }
        }

        info!("worker stopped");
        Ok(())
    }

    /// Blocking pop with retry on transient queue errors.
    async fn pop_with_retry(&self) -> Option<rforge_queue::QueuedJob> {
        let timeout = self.ctx.config.dequeue_timeout;
        let config = RetryConfig::new("queue_pop").with_base_delay(Duration::from_millis(250));

        match retry_async(&config, || self.ctx.queue.pop_blocking(timeout))
            .await
            .into_result()
        {
            Ok(popped) => popped,
            Err(e) => {
                error!(error = %e, "queue pop failed after retries, backing off");
                tokio::time::sleep(Duration::from_secs(5)).await;
                None
            }
        }
    }

    /// On startup, re-run every job stuck in a non-terminal state before
    /// consuming new work.
    async fn resume_interrupted(&self) {
        let stuck = match self.ctx.jobs.list_non_terminal().await {
            Ok(stuck) => stuck,
            Err(e) => {
                warn!(error = %e, "resume scan failed");
                return;
            }
        };

        for job in stuck {
            info!(job_id = %job.id, status = %job.status, "resuming interrupted job");
            if let Err(e) = run_job(&self.ctx, &job.id, self.shutdown.subscribe()).await {
                error!(job_id = %job.id, error = %e, "resumed job failed");
            }
        }
    }
}
