//! Canonical key layout under the storage root.
//!
//! Every writer owns a unique subtree keyed by `jobs/{id}/...`; uploads
//! live under `uploads/{uuid}/{filename}`.

/// Key builders for one job's subtree.
#[derive(Debug, Clone)]
pub struct JobKeys {
    job_id: String,
}

impl JobKeys {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    pub fn root(&self) -> String {
        format!("jobs/{}", self.job_id)
    }

    pub fn scene_graph(&self) -> String {
        format!("jobs/{}/scene_graph.json", self.job_id)
    }

    pub fn timeline(&self) -> String {
        format!("jobs/{}/timeline.json", self.job_id)
    }

    /// Raw engine output for one scene.
    pub fn scene_clip(&self, scene_id: u32) -> String {
        format!("jobs/{}/scenes/scene_{}.mp4", self.job_id, scene_id)
    }

    /// Post-processed (geometry-normalized) scene clip.
    pub fn processed_scene(&self, scene_id: u32) -> String {
        format!("jobs/{}/processed/scene_{}.mp4", self.job_id, scene_id)
    }

    /// Assembly pipeline intermediate, e.g. stage 1 "compose" →
    /// `assembly/01_compose.mp4`.
    pub fn assembly_stage(&self, number: u32, stage: &str) -> String {
        format!("jobs/{}/assembly/{:02}_{}.mp4", self.job_id, number, stage)
    }

    /// Audio pipeline intermediate.
    pub fn audio(&self, name: &str) -> String {
        format!("jobs/{}/audio/{}", self.job_id, name)
    }

    /// Directory prefix holding audio intermediates.
    pub fn audio_dir(&self) -> String {
        format!("jobs/{}/audio", self.job_id)
    }

    /// Directory prefix holding raw scene clips.
    pub fn scenes_dir(&self) -> String {
        format!("jobs/{}/scenes", self.job_id)
    }

    /// Directory prefix holding assembly intermediates.
    pub fn assembly_dir(&self) -> String {
        format!("jobs/{}/assembly", self.job_id)
    }

    pub fn output(&self) -> String {
        format!("jobs/{}/output.mp4", self.job_id)
    }

    pub fn thumbnail(&self) -> String {
        format!("jobs/{}/thumbnail.jpg", self.job_id)
    }

    pub fn captions_srt(&self) -> String {
        format!("jobs/{}/captions.srt", self.job_id)
    }

    pub fn metadata(&self) -> String {
        format!("jobs/{}/metadata.json", self.job_id)
    }

    pub fn fallback_template(&self) -> String {
        format!("jobs/{}/fallback_template.mp4", self.job_id)
    }
}

/// Key for a user-uploaded asset.
pub fn upload_key(upload_id: &str, filename: &str) -> String {
    format!("uploads/{upload_id}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_layout() {
        let keys = JobKeys::new("j-42");
        assert_eq!(keys.scene_graph(), "jobs/j-42/scene_graph.json");
        assert_eq!(keys.scene_clip(3), "jobs/j-42/scenes/scene_3.mp4");
        assert_eq!(keys.processed_scene(3), "jobs/j-42/processed/scene_3.mp4");
        assert_eq!(keys.assembly_stage(1, "compose"), "jobs/j-42/assembly/01_compose.mp4");
        assert_eq!(keys.output(), "jobs/j-42/output.mp4");
        assert_eq!(keys.captions_srt(), "jobs/j-42/captions.srt");
    }

    #[test]
    fn test_upload_key() {
        assert_eq!(upload_key("u-1", "hero.png"), "uploads/u-1/hero.png");
    }
}
