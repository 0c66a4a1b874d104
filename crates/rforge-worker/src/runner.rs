//! The job runner: drives one job through the state machine.
//!
//! `QUEUED → PLANNING_SCENES → BUILDING_TIMELINE → RENDERING_SCENES →
//! COMPOSING → AUDIO_ASSEMBLY → FINALIZING → DONE`, with `FAILED`
//! reachable from any non-terminal state. On resume, phases the job
//! already passed are recomputed in memory without re-transitioning, and
//! only scenes not yet complete are re-dispatched.

use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use rforge_audio::align_captions;
use rforge_engines::{RenderOptions, SceneRenderResult};
use rforge_models::{
    build_timeline, plan_scenes, CaptionTrack, JobId, JobRecord, JobStatus, PlanInput,
    SceneGraph, SceneRecord, SceneStatus, Timeline,
};
use rforge_state::{JobUpdate, SceneUpdate};
use rforge_storage::JobKeys;

use crate::assembler::Assembler;
use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::template::generate_template_video;

/// Progress covered by the scene fan-out (25 → 75).
fn render_progress_pct(completed: usize, total: usize) -> f32 {
    if total == 0 {
        return 25.0;
    }
    25.0 + (completed as f32 / total as f32) * 50.0
}

/// Run one job to a terminal state.
pub async fn run_job(
    ctx: &WorkerContext,
    job_id: &JobId,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<()> {
    let Some(mut job) = ctx.jobs.try_get(job_id).await? else {
        // Missing row on a dequeued id is a producer bug; skip rather than
        // wedge the loop.
        error!(job_id = %job_id, "job record not found for queued id");
        return Ok(());
    };
    if job.status.is_terminal() {
        info!(job_id = %job_id, status = %job.status, "job already terminal");
        return Ok(());
    }

    let logger = JobLogger::new(job_id, "render_job");
    logger.start(&format!("status {}", job.status));

    // --- PLANNING_SCENES -------------------------------------------------
    advance(ctx, &mut job, JobStatus::PlanningScenes, 5.0).await?;
    let graph = match load_or_plan_graph(ctx, &mut job).await {
        Ok(graph) => graph,
        Err(e) => {
            logger.failure(&format!("planning failed: {e}"));
            return finish_with_template(ctx, &job, JobStatus::Failed, format!("planning: {e}"))
                .await;
        }
    };

    // --- BUILDING_TIMELINE ------------------------------------------------
    advance(ctx, &mut job, JobStatus::BuildingTimeline, 15.0).await?;
    let mut timeline = match build_and_persist_timeline(ctx, &mut job, &graph).await {
        Ok(timeline) => timeline,
        Err(e) => {
            logger.failure(&format!("timeline build failed: {e}"));
            return finish_with_template(ctx, &job, JobStatus::Failed, format!("timeline: {e}"))
                .await;
        }
    };

    // --- RENDERING_SCENES -------------------------------------------------
    advance(ctx, &mut job, JobStatus::RenderingScenes, 25.0).await?;
    let scene_clips = match render_scenes(ctx, &job, &graph, cancel.clone()).await {
        Ok(clips) => clips,
        Err(e) => {
            logger.failure(&format!("scene rendering failed: {e}"));
            return finish_with_template(ctx, &job, JobStatus::Done, format!("scenes: {e}")).await;
        }
    };
    logger.progress(&format!("{} scene clips ready", scene_clips.len()));

    // --- COMPOSING → AUDIO_ASSEMBLY → FINALIZING --------------------------
    match assemble(ctx, &mut job, &graph, &mut timeline, &scene_clips).await {
        Ok(()) => {
            let keys = JobKeys::new(job.id.as_str());
            ctx.store.remove_prefix(&keys.assembly_dir()).await.ok();
            metrics::counter!("rforge_jobs_completed").increment(1);
            logger.complete("output written");
            Ok(())
        }
        Err(e) => {
            logger.failure(&format!("assembly failed: {e}"));
            finish_with_template(ctx, &job, JobStatus::Done, format!("assembly: {e}")).await
        }
    }
}

/// Transition forward; re-entering or skipping backward phases on resume
/// is a no-op.
async fn advance(
    ctx: &WorkerContext,
    job: &mut JobRecord,
    status: JobStatus,
    progress: f32,
) -> WorkerResult<()> {
    if job.status.can_transition_to(status) {
        *job = ctx
            .jobs
            .transition(
                &job.id,
                status,
                JobUpdate {
                    progress_pct: Some(progress),
                    ..Default::default()
                },
            )
            .await?;
    }
    Ok(())
}

/// The scene graph was produced eagerly at acceptance; fall back to
/// planning from the persisted request when a foreign producer omitted it.
async fn load_or_plan_graph(
    ctx: &WorkerContext,
    job: &mut JobRecord,
) -> WorkerResult<SceneGraph> {
    if let Some(json) = &job.scene_graph_json {
        return Ok(SceneGraph::from_json(json)?);
    }

    let request = job
        .render_request()
        .ok_or_else(|| WorkerError::job_failed("job has neither scene graph nor render spec"))?;
    let graph = plan_scenes(&PlanInput {
        media_assets: request.image_uris.clone(),
        prompt: request.prompt.clone(),
        preset_id: request.preset_id.clone(),
        brand_safe: request.brand_safe,
        target_duration_seconds: request.target_duration_seconds,
        voiceover_duration_ms: None,
        engine_preference: request.engine_preference.clone(),
    })?;

    let json = graph.to_json()?;
    let keys = JobKeys::new(job.id.as_str());
    ctx.store
        .save_bytes(&keys.scene_graph(), json.as_bytes())
        .await?;
    *job = ctx.jobs.save_scene_graph(&job.id, json).await?;
    Ok(graph)
}

async fn build_and_persist_timeline(
    ctx: &WorkerContext,
    job: &mut JobRecord,
    graph: &SceneGraph,
) -> WorkerResult<Timeline> {
    let timeline = build_timeline(graph, ctx.config.render.transition.default_duration_ms)?;
    let json = timeline.to_json()?;

    let keys = JobKeys::new(job.id.as_str());
    ctx.store
        .save_bytes(&keys.timeline(), json.as_bytes())
        .await?;
    *job = ctx.jobs.save_timeline(&job.id, json).await?;
    Ok(timeline)
}

/// Dispatch incomplete scenes through the engine manager, applying each
/// completion to the scene records and job progress as it arrives.
/// Returns clip paths for every scene in graph order.
async fn render_scenes(
    ctx: &WorkerContext,
    job: &JobRecord,
    graph: &SceneGraph,
    cancel: watch::Receiver<bool>,
) -> WorkerResult<Vec<PathBuf>> {
    // Create records on first entry; resume reuses the existing set.
    let existing = ctx.scenes.list_for_job(&job.id).await?;
    if existing.is_empty() {
        let records: Vec<SceneRecord> = graph
            .scenes
            .iter()
            .enumerate()
            .map(|(index, scene)| {
                SceneRecord::new(
                    job.id.clone(),
                    scene.id,
                    index as u32,
                    scene.description.clone(),
                    scene.duration,
                    scene.media.media_type(),
                )
            })
            .collect();
        ctx.scenes.create_all(&records).await?;
    }

    let incomplete = ctx.scenes.incomplete_for_job(&job.id).await?;
    let total = graph.scenes.len();
    let completed_before = total - incomplete.len();

    if !incomplete.is_empty() {
        let incomplete_ids: Vec<u32> = incomplete.iter().map(|s| s.scene_id).collect();
        for scene_id in &incomplete_ids {
            ctx.scenes
                .transition(&job.id, *scene_id, SceneStatus::Rendering, SceneUpdate::default())
                .await?;
        }

        // Only scenes not yet complete are re-dispatched.
        let subgraph = SceneGraph {
            version: graph.version.clone(),
            scenes: graph
                .scenes
                .iter()
                .filter(|s| incomplete_ids.contains(&s.id))
                .cloned()
                .collect(),
            global_audio: graph.global_audio.clone(),
        };

        let keys = JobKeys::new(job.id.as_str());
        let output_dir = ctx.store.local_path(&keys.scenes_dir());

        let request = job.render_request();
        let options = RenderOptions {
            brand_safe: job.brand_safe,
            preset_id: job.preset_id.clone(),
            engine_override: request
                .as_ref()
                .and_then(|r| r.engine_preference.as_deref())
                .and_then(|s| s.parse().ok()),
        };

        let (tx, mut rx) = mpsc::channel::<SceneRenderResult>(16);
        let scenes_repo = ctx.scenes.clone();
        let jobs_repo = ctx.jobs.clone();
        let job_id = job.id.clone();

        let consumer = tokio::spawn(async move {
            let mut completed = completed_before;
            while let Some(result) = rx.recv().await {
                let status = if !result.success {
                    SceneStatus::Failed
                } else if result.fallback_used {
                    SceneStatus::Fallback
                } else {
                    SceneStatus::Done
                };

                let update = SceneUpdate {
                    engine_used: result.engine_used.map(|e| e.to_string()),
                    asset_path: result
                        .clip_path
                        .as_ref()
                        .map(|p| p.display().to_string()),
                    fallback_used: Some(result.fallback_used),
                    render_duration_ms: Some(result.elapsed_ms),
                    error_message: result.error.clone(),
                };
                // A missing row here is a programmer error; log and keep
                // the batch going.
                if let Err(e) = scenes_repo
                    .transition(&job_id, result.scene_id, status, update)
                    .await
                {
                    warn!(scene_id = result.scene_id, error = %e, "scene transition failed");
                }

                if status != SceneStatus::Failed {
                    completed += 1;
                }
                jobs_repo
                    .set_progress(&job_id, render_progress_pct(completed, total))
                    .await
                    .ok();
            }
        });

        ctx.engines
            .clone()
            .render_all(&subgraph, &output_dir, &options, Some(tx), cancel)
            .await;
        consumer.await.ok();
    }

    // Every scene must now hold a clip path.
    let records = ctx.scenes.list_for_job(&job.id).await?;
    let mut clips = Vec::with_capacity(records.len());
    for record in &records {
        if !record.status.is_complete() {
            return Err(WorkerError::job_failed(format!(
                "scene {} did not complete: {}",
                record.scene_id,
                record.error_message.as_deref().unwrap_or("unknown error")
            )));
        }
        let path = record
            .asset_path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .ok_or_else(|| {
                WorkerError::job_failed(format!("scene {} clip missing", record.scene_id))
            })?;
        clips.push(path);
    }
    Ok(clips)
}

/// COMPOSING through FINALIZING.
async fn assemble(
    ctx: &WorkerContext,
    job: &mut JobRecord,
    graph: &SceneGraph,
    timeline: &mut Timeline,
    scene_clips: &[PathBuf],
) -> WorkerResult<()> {
    let assembler = Assembler::new(&ctx.store, &ctx.config.render, job);

    advance(ctx, job, JobStatus::Composing, 78.0).await?;

    // Voice is acquired before captions so alignment can refine the
    // caption track the burn-in uses.
    let voice = assembler.acquire_voice(graph).await?;
    refine_captions(ctx, job, timeline, &voice).await?;

    let composed = assembler.compose(timeline, scene_clips).await?;
    let captioned = assembler.burn_captions(&composed, timeline).await?;
    let branded = assembler.brand_overlay(&captioned).await?;

    advance(ctx, job, JobStatus::AudioAssembly, 85.0).await?;
    let with_audio = assembler.mix_and_mux(&branded, graph, timeline, &voice).await?;

    advance(ctx, job, JobStatus::Finalizing, 92.0).await?;
    let scene_records = ctx.scenes.list_for_job(&job.id).await?;
    let artifacts = assembler.finalize(&with_audio, timeline, &scene_records).await?;

    let any_fallback = scene_records.iter().any(|s| s.fallback_used);
    *job = ctx
        .jobs
        .transition(
            &job.id,
            JobStatus::Done,
            JobUpdate {
                progress_pct: Some(100.0),
                output_uri: Some(artifacts.output_uri),
                thumbnail_uri: Some(artifacts.thumbnail_uri),
                metadata_uri: Some(artifacts.metadata_uri),
                fallback_used: Some(any_fallback),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}

/// Replace the timeline captions with aligned ones when alignment yields a
/// track that still satisfies the scene-window invariant.
async fn refine_captions(
    ctx: &WorkerContext,
    job: &JobRecord,
    timeline: &mut Timeline,
    voice: &crate::assembler::VoiceAssets,
) -> WorkerResult<()> {
    if voice.transcript.is_empty() {
        return Ok(());
    }

    let bounds: Vec<(u32, u64, u64)> = timeline
        .timeline
        .iter()
        .map(|e| (e.scene_id, e.start, e.end))
        .collect();
    let aligned = align_captions(&[], voice.path.as_deref(), &voice.transcript, &bounds).await;
    if aligned.captions.is_empty() {
        return Ok(());
    }

    let mut candidate = timeline.clone();
    candidate.tracks.captions = aligned
        .captions
        .iter()
        .map(|c| CaptionTrack {
            text: c.text.clone(),
            start: c.start_ms,
            end: c.end_ms,
            scene_id: c.scene_id,
            style: None,
        })
        .collect();

    if candidate.validate().is_ok() {
        *timeline = candidate;
        let json = timeline.to_json()?;
        let keys = JobKeys::new(job.id.as_str());
        ctx.store
            .save_bytes(&keys.timeline(), json.as_bytes())
            .await?;
        ctx.jobs.save_timeline(&job.id, json).await?;
    } else {
        warn!(job_id = %job.id, "aligned captions violate scene windows, keeping planned track");
    }
    Ok(())
}

/// Terminal path for fatal errors: write a template output so the client
/// can always fetch a playable artifact.
async fn finish_with_template(
    ctx: &WorkerContext,
    job: &JobRecord,
    terminal: JobStatus,
    reason: String,
) -> WorkerResult<()> {
    let template_uri = match generate_template_video(
        &ctx.store,
        &job.id,
        job.target_duration_seconds,
        "Video rendering did not complete",
    )
    .await
    {
        Ok(uri) => Some(uri),
        Err(e) => {
            error!(job_id = %job.id, error = %e, "template fallback generation failed");
            None
        }
    };

    let update = JobUpdate {
        progress_pct: Some(100.0),
        output_uri: template_uri,
        fallback_used: Some(true),
        fallback_reason: Some(reason.clone()),
        error: (terminal == JobStatus::Failed).then_some(reason),
        ..Default::default()
    };
    ctx.jobs.transition(&job.id, terminal, update).await?;
    metrics::counter!("rforge_jobs_template_fallback").increment(1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_progress_window() {
        assert_eq!(render_progress_pct(0, 4), 25.0);
        assert_eq!(render_progress_pct(2, 4), 50.0);
        assert_eq!(render_progress_pct(4, 4), 75.0);
        assert_eq!(render_progress_pct(0, 0), 25.0);
    }
}
