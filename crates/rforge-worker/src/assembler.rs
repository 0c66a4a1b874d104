//! Final assembly: composition, captions, brand overlay, audio, export.
//!
//! Each stage consumes the previous stage's file under
//! `jobs/{id}/assembly/{NN_stage}.mp4`. The assembler owns that subtree
//! exclusively for the current job; the runner prunes it at job
//! termination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use rforge_audio::{
    build_audio_bed, generate_voiceover, ingest_voice, map_voice_to_scenes, mixer, AudioBedInputs,
};
use rforge_captions::{render_captions, resolve_style};
use rforge_media::{
    compose_scenes, export_final, extract_thumbnail, overlay_image, OverlaySpec, Transition,
    TransitionKind,
};
use rforge_models::{
    JobRecord, Preset, RenderConfig, SceneGraph, SceneRecord, Timeline, TransitionType,
};
use rforge_storage::{JobKeys, LocalStore};

use crate::error::WorkerResult;

/// Acquired voiceover assets shared between the caption and audio stages.
#[derive(Debug, Default)]
pub struct VoiceAssets {
    pub path: Option<PathBuf>,
    pub transcript: String,
    pub duration_ms: Option<u64>,
    /// Voice-active spans in ms, for ducking.
    pub spans_ms: Vec<(u64, u64)>,
}

/// Final artifacts written by the last stage.
#[derive(Debug, Clone)]
pub struct FinalArtifacts {
    pub output_uri: String,
    pub thumbnail_uri: String,
    pub captions_uri: String,
    pub metadata_uri: String,
}

/// Per-scene entry of the render metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneClipMetadata {
    pub scene_id: u32,
    pub engine: Option<String>,
    pub fallback_used: bool,
    pub duration_ms: u64,
}

/// Summary document written next to the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    pub job_id: String,
    pub preset_id: String,
    pub brand_safe: bool,
    pub target_duration_seconds: u32,
    pub scenes: Vec<SceneClipMetadata>,
    pub fallback_used: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RenderMetadata {
    /// Build the metadata summary from the job and its scene records.
    pub fn from_records(job: &JobRecord, scenes: &[SceneRecord]) -> Self {
        Self {
            job_id: job.id.to_string(),
            preset_id: job.preset_id.clone(),
            brand_safe: job.brand_safe,
            target_duration_seconds: job.target_duration_seconds,
            scenes: scenes
                .iter()
                .map(|s| SceneClipMetadata {
                    scene_id: s.scene_id,
                    engine: s.engine_used.clone(),
                    fallback_used: s.fallback_used,
                    duration_ms: s.duration_ms,
                })
                .collect(),
            fallback_used: job.fallback_used || scenes.iter().any(|s| s.fallback_used),
            created_at: job.created_at,
            completed_at: Utc::now(),
        }
    }
}

fn media_transition(kind: TransitionType) -> TransitionKind {
    match kind {
        TransitionType::Cut => TransitionKind::Cut,
        TransitionType::Fade => TransitionKind::Fade,
        TransitionType::FadeBlack => TransitionKind::FadeBlack,
        TransitionType::SwipeLeft => TransitionKind::SwipeLeft,
        TransitionType::SwipeRight => TransitionKind::SwipeRight,
    }
}

/// Stage pipeline for one job.
pub struct Assembler<'a> {
    store: &'a LocalStore,
    config: &'a RenderConfig,
    job: JobRecord,
    keys: JobKeys,
}

impl<'a> Assembler<'a> {
    pub fn new(store: &'a LocalStore, config: &'a RenderConfig, job: &JobRecord) -> Self {
        let keys = JobKeys::new(job.id.as_str());
        Self {
            store,
            config,
            job: job.clone(),
            keys,
        }
    }

    fn stage_path(&self, number: u32, stage: &str) -> PathBuf {
        self.store.local_path(&self.keys.assembly_stage(number, stage))
    }

    /// Voice acquisition: ingest the referenced file or synthesize via the
    /// TTS chain. Scenes pass through the mapper to produce voice-active
    /// spans for ducking.
    pub async fn acquire_voice(&self, graph: &SceneGraph) -> WorkerResult<VoiceAssets> {
        let audio_dir = self.store.local_path(&self.keys.audio_dir());
        let transcript = graph
            .global_audio
            .voice_script
            .clone()
            .unwrap_or_default();

        let (path, duration_ms) = if let Some(reference) = &graph.global_audio.voice_file {
            let source = self.resolve_asset(reference);
            match source {
                Some(source) => {
                    let ingest = ingest_voice(&source, &audio_dir, Some(60_000)).await?;
                    (Some(ingest.audio_path), Some(ingest.duration_ms))
                }
                None => {
                    warn!(job_id = %self.job.id, reference, "voice file not found");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let (path, duration_ms) = match (path, transcript.is_empty()) {
            (Some(path), _) => (Some(path), duration_ms),
            (None, false) => {
                let tts = generate_voiceover(&transcript, &audio_dir, &self.config.tts).await?;
                (Some(tts.audio_path), Some(tts.duration_ms))
            }
            (None, true) => (None, None),
        };

        let spans_ms = if transcript.is_empty() {
            // Without a transcript the whole voice span ducks the music.
            duration_ms.map(|ms| vec![(0, ms)]).unwrap_or_default()
        } else {
            let scenes: Vec<(u32, u64)> = graph.scenes.iter().map(|s| (s.id, s.duration)).collect();
            map_voice_to_scenes(&transcript, &scenes, duration_ms)
                .segments
                .iter()
                .map(|seg| (seg.start_ms, seg.end_ms))
                .collect()
        };

        Ok(VoiceAssets {
            path,
            transcript,
            duration_ms,
            spans_ms,
        })
    }

    /// Stage 1: compose processed scene clips with the timeline's
    /// transitions. `scene_clips` must follow timeline order.
    pub async fn compose(
        &self,
        timeline: &Timeline,
        scene_clips: &[PathBuf],
    ) -> WorkerResult<PathBuf> {
        let out = self.stage_path(1, "compose");

        let transitions: Vec<Transition> = timeline
            .timeline
            .iter()
            .take(timeline.timeline.len().saturating_sub(1))
            .map(|entry| {
                let spec = entry.transition.unwrap_or_else(|| {
                    rforge_models::TransitionSpec::new(TransitionType::Cut, 0)
                });
                Transition::new(media_transition(spec.kind), spec.duration)
            })
            .collect();

        compose_scenes(
            scene_clips,
            &transitions,
            &out,
            self.config.output.width,
            self.config.output.height,
            self.config.output.fps,
        )
        .await?;

        info!(job_id = %self.job.id, clips = scene_clips.len(), "assembly compose done");
        Ok(out)
    }

    /// Stage 2: burn styled captions from the timeline's caption track.
    pub async fn burn_captions(
        &self,
        input: &Path,
        timeline: &Timeline,
    ) -> WorkerResult<PathBuf> {
        if timeline.tracks.captions.is_empty() {
            return Ok(input.to_path_buf());
        }
        let out = self.stage_path(2, "captions");
        let preset = Preset::lookup(&self.job.preset_id);
        let style = resolve_style(preset, self.job.brand_safe);

        render_captions(
            input,
            &out,
            &timeline.tracks.captions,
            &style,
            self.config.output.width,
        )
        .await?;

        info!(job_id = %self.job.id, "assembly captions done");
        Ok(out)
    }

    /// Stage 3: semi-transparent brand logo in a corner, brand-safe only.
    pub async fn brand_overlay(&self, input: &Path) -> WorkerResult<PathBuf> {
        if !self.job.brand_safe {
            return Ok(input.to_path_buf());
        }
        let logo = self.store.local_path("brand/logo.png");
        if !logo.exists() {
            return Ok(input.to_path_buf());
        }

        let out = self.stage_path(3, "brand");
        overlay_image(input, &logo, &out, &OverlaySpec::watermark()).await?;
        info!(job_id = %self.job.id, "assembly brand overlay done");
        Ok(out)
    }

    /// Stage 4: build the audio bed (music fit, ducking, mix), mux it onto
    /// the composed video, then loudness-normalize.
    pub async fn mix_and_mux(
        &self,
        input: &Path,
        graph: &SceneGraph,
        timeline: &Timeline,
        voice: &VoiceAssets,
    ) -> WorkerResult<PathBuf> {
        let audio_dir = self.store.local_path(&self.keys.audio_dir());
        let total_duration_seconds = timeline.total_duration as f64 / 1000.0;

        let music_source = graph
            .global_audio
            .background_music
            .as_deref()
            .and_then(|reference| self.resolve_music(reference));

        let bed = build_audio_bed(&AudioBedInputs {
            voice: voice.path.as_deref(),
            music_source: music_source.as_deref(),
            voice_spans_ms: voice.spans_ms.clone(),
            total_duration_seconds,
            work_dir: &audio_dir,
        })
        .await?;

        let muxed = self.stage_path(4, "audio");
        mixer::mux(input, &bed, &muxed).await?;

        let normalized = self.stage_path(5, "normalized");
        mixer::normalize(&muxed, &normalized).await?;

        info!(job_id = %self.job.id, "assembly audio done");
        Ok(normalized)
    }

    /// Stages 5-6: final export, thumbnail, subtitles, metadata.
    pub async fn finalize(
        &self,
        input: &Path,
        timeline: &Timeline,
        scene_records: &[SceneRecord],
    ) -> WorkerResult<FinalArtifacts> {
        let output_key = self.keys.output();
        let output_path = self.store.local_path(&output_key);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        export_final(
            input,
            &output_path,
            self.config.output.width,
            self.config.output.height,
            self.config.output.fps,
            &self.config.output.max_bitrate,
        )
        .await?;

        let thumbnail_key = self.keys.thumbnail();
        extract_thumbnail(&output_path, self.store.local_path(&thumbnail_key), 1.0).await?;

        let captions_key = self.keys.captions_srt();
        rforge_captions::write_srt(
            &timeline.tracks.captions,
            self.store.local_path(&captions_key),
        )
        .await?;

        let metadata = RenderMetadata::from_records(&self.job, scene_records);
        let metadata_key = self.keys.metadata();
        self.store
            .save_bytes(&metadata_key, serde_json::to_string_pretty(&metadata)?.as_bytes())
            .await?;

        info!(job_id = %self.job.id, output = %output_path.display(), "assembly finalized");
        Ok(FinalArtifacts {
            output_uri: self.store.uri(&output_key),
            thumbnail_uri: self.store.uri(&thumbnail_key),
            captions_uri: self.store.uri(&captions_key),
            metadata_uri: self.store.uri(&metadata_key),
        })
    }

    /// Resolve a persisted asset reference (opaque URI or bare key) to a
    /// local path.
    fn resolve_asset(&self, reference: &str) -> Option<PathBuf> {
        let key = self
            .store
            .key_from_uri(reference)
            .unwrap_or_else(|_| reference.to_string());
        let path = self.store.local_path(&key);
        path.exists().then_some(path)
    }

    /// Resolve a music reference: an asset key/URI first, then the shared
    /// music library.
    fn resolve_music(&self, reference: &str) -> Option<PathBuf> {
        if let Some(path) = self.resolve_asset(reference) {
            return Some(path);
        }
        for ext in ["mp3", "wav", "aac", "ogg"] {
            let path = self.store.local_path(&format!("music/{reference}.{ext}"));
            if path.exists() {
                return Some(path);
            }
        }
        warn!(reference, "background music not found");
        None
    }
}
