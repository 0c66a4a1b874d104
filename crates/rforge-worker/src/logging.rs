//! Structured per-job logging.

use tracing::{error, info, warn, Span};

use rforge_models::JobId;

/// Job logger with consistent contextual fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn start(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job started: {message}");
    }

    pub fn progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job progress: {message}");
    }

    pub fn warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = %self.operation, "job warning: {message}");
    }

    pub fn failure(&self, message: &str) {
        error!(job_id = %self.job_id, operation = %self.operation, "job error: {message}");
    }

    pub fn complete(&self, message: &str) {
        info!(job_id = %self.job_id, operation = %self.operation, "job completed: {message}");
    }

    /// A tracing span carrying the job context.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = %self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_fields() {
        let job_id = JobId::from_string("j-1");
        let logger = JobLogger::new(&job_id, "render");
        assert_eq!(logger.job_id, "j-1");
        assert_eq!(logger.operation, "render");
    }
}
