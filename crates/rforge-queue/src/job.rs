//! Queue payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The message placed on the job queue. Unknown extra fields are ignored on
/// decode so producers can evolve the payload independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJob {
    pub job_id: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            enqueued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let job = QueuedJob::new("j-1");
        let json = serde_json::to_string(&job).unwrap();
        let back: QueuedJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let back: QueuedJob = serde_json::from_str(
            r#"{"jobId":"j-2","enqueuedAt":"2026-01-01T00:00:00Z","priority":3}"#,
        )
        .unwrap();
        assert_eq!(back.job_id, "j-2");
    }
}
