//! Template fallback video.
//!
//! A colored-background clip with a generic message, written when assembly
//! fails fatally. Every job gets a playable artifact.

use tracing::info;

use rforge_media::color_card;
use rforge_models::JobId;
use rforge_storage::{JobKeys, LocalStore};

use crate::error::WorkerResult;

/// Generate the template video and return its storage URI.
pub async fn generate_template_video(
    store: &LocalStore,
    job_id: &JobId,
    duration_seconds: u32,
    text: &str,
) -> WorkerResult<String> {
    let keys = JobKeys::new(job_id.as_str());
    let key = keys.fallback_template();
    let out_path = store.local_path(&key);
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    color_card(
        &out_path,
        text,
        None,
        "0x1A1A2E",
        f64::from(duration_seconds.max(1)),
        1080,
        1920,
        30,
    )
    .await?;

    let uri = store.uri(&key);
    info!(job_id = %job_id, duration_seconds, "template fallback written");
    Ok(uri)
}
