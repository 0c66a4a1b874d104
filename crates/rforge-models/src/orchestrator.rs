//! Timeline orchestrator — converts a [`SceneGraph`] into a [`Timeline`].
//!
//! Scenes are laid out sequentially; a crossfade borrows its duration from
//! both neighbors, so the cursor advances by `duration - overlap`. Video,
//! caption and audio tracks are derived from the same walk so every timed
//! record traces back to a timeline entry.

use thiserror::Error;
use tracing::{info, warn};

use crate::scene_graph::{Scene, SceneGraph, TransitionType, MAX_TOTAL_DURATION_MS};
use crate::timeline::{
    AudioTrack, AudioTrackKind, CaptionTrack, Timeline, TimelineEntry, TimelineError, Tracks,
    TransitionSpec, VideoTrack,
};

/// Default crossfade duration for non-cut transitions.
pub const DEFAULT_TRANSITION_MS: u64 = 500;

/// Lead-in/lead-out inset applied to scene captions.
const CAPTION_INSET_MS: u64 = 200;

/// Errors raised while building a timeline.
#[derive(Debug, Error)]
pub enum TimelineBuildError {
    #[error(transparent)]
    Invalid(#[from] TimelineError),
}

/// Build a validated timeline from a validated scene graph.
pub fn build_timeline(
    scene_graph: &SceneGraph,
    default_transition_ms: u64,
) -> Result<Timeline, TimelineBuildError> {
    let scenes = &scene_graph.scenes;

    let mut entries = layout_entries(scenes, default_transition_ms, None);
    let mut total_duration = entries.last().map(|e| e.end).unwrap_or(0);

    if total_duration > MAX_TOTAL_DURATION_MS {
        warn!(
            original_ms = total_duration,
            "timeline exceeds duration cap, reducing proportionally"
        );
        entries = proportional_reduce(scenes, default_transition_ms, total_duration);
        total_duration = entries.last().map(|e| e.end).unwrap_or(0);
    }

    let mut video = Vec::new();
    for scene in scenes {
        video.push(VideoTrack {
            scene_id: scene.id,
            asset: scene.media.asset().map(str::to_string),
            effect: effect_name(scene),
            layer: 0,
            transform: None,
        });
        for (i, overlay) in scene.overlays.iter().enumerate() {
            video.push(VideoTrack {
                scene_id: scene.id,
                asset: Some(overlay.asset.clone()),
                effect: None,
                layer: 1 + i as u32,
                transform: None,
            });
        }
    }

    let mut captions = Vec::new();
    for scene in scenes {
        if scene.caption.is_empty() {
            continue;
        }
        let entry = entries
            .iter()
            .find(|e| e.scene_id == scene.id)
            .expect("every scene has a timeline entry");

        let mut start = entry.start + CAPTION_INSET_MS;
        let mut end = entry.end.saturating_sub(CAPTION_INSET_MS);
        if end <= start {
            start = entry.start;
            end = entry.end;
        }
        captions.push(CaptionTrack {
            text: scene.caption.clone(),
            start,
            end,
            scene_id: Some(scene.id),
            style: None,
        });
    }

    let mut audio = Vec::new();
    if scene_graph.global_audio.has_voice() {
        audio.push(AudioTrack {
            kind: AudioTrackKind::Voiceover,
            file: scene_graph.global_audio.voice_file.clone(),
            start: 0,
            end: Some(total_duration),
            volume: 1.0,
            duck_regions: Vec::new(),
        });
    }
    if let Some(music) = &scene_graph.global_audio.background_music {
        audio.push(AudioTrack {
            kind: AudioTrackKind::Music,
            file: Some(music.clone()),
            start: 0,
            end: Some(total_duration),
            volume: 0.5,
            duck_regions: Vec::new(),
        });
    }

    let timeline = Timeline::new(
        total_duration,
        entries,
        Tracks {
            video,
            audio,
            captions,
        },
    )?;

    info!(
        scene_count = timeline.timeline.len(),
        total_duration_ms = timeline.total_duration,
        caption_count = timeline.tracks.captions.len(),
        "timeline built"
    );
    Ok(timeline)
}

fn effect_name(scene: &Scene) -> Option<String> {
    match &scene.media {
        crate::scene_graph::SceneMedia::Image { effect, .. } => effect
            .as_ref()
            .and_then(|e| serde_json::to_value(e).ok())
            .and_then(|v| v.as_str().map(str::to_string)),
        crate::scene_graph::SceneMedia::Video { .. } => None,
    }
}

/// Lay out entries with crossfade overlap. When `scale` is given, each
/// scene duration is reduced by `scale` (numerator/denominator) with the 1s
/// floor, and the overlap is clamped to half of the reduced duration so
/// every scene keeps a positive span.
fn layout_entries(
    scenes: &[Scene],
    default_transition_ms: u64,
    scale: Option<(u64, u64)>,
) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(scenes.len());
    let mut cursor: u64 = 0;

    for (i, scene) in scenes.iter().enumerate() {
        let is_last = i == scenes.len() - 1;

        let duration = match scale {
            Some((num, den)) => ((scene.duration * num) / den.max(1)).max(1_000),
            None => scene.duration,
        };

        let mut transition = None;
        let mut overlap = 0;
        if !is_last {
            let mut t_dur = if scene.transition == TransitionType::Cut {
                0
            } else {
                default_transition_ms
            };
            if scale.is_some() {
                t_dur = t_dur.min(duration / 2);
            }
            transition = Some(TransitionSpec::new(scene.transition, t_dur));
            overlap = t_dur;
        }

        entries.push(TimelineEntry {
            scene_id: scene.id,
            start: cursor,
            end: cursor + duration,
            transition,
        });

        cursor += duration - overlap;
    }

    entries
}

/// Rebuild the layout with durations scaled down to fit the 60 s cap.
fn proportional_reduce(
    scenes: &[Scene],
    default_transition_ms: u64,
    original_total: u64,
) -> Vec<TimelineEntry> {
    layout_entries(
        scenes,
        default_transition_ms,
        Some((MAX_TOTAL_DURATION_MS, original_total.max(1))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::{GlobalAudio, SceneMedia, SceneStyle, VisualEffect};

    fn scene(id: u32, duration: u64, transition: TransitionType) -> Scene {
        Scene {
            id,
            description: format!("Scene {id}"),
            duration,
            media: SceneMedia::Video {
                engine: None,
                prompt: Some("product spin".into()),
                asset: None,
            },
            caption: format!("Caption {id}"),
            style: SceneStyle::default(),
            overlays: Vec::new(),
            transition,
        }
    }

    fn graph(scenes: Vec<Scene>) -> SceneGraph {
        SceneGraph::new(scenes, GlobalAudio::default()).unwrap()
    }

    #[test]
    fn test_sequential_layout_with_crossfade_overlap() {
        let g = graph(vec![
            scene(1, 5_000, TransitionType::Fade),
            scene(2, 5_000, TransitionType::Fade),
            scene(3, 5_000, TransitionType::Fade),
        ]);
        let tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();

        assert_eq!(tl.timeline[0].start, 0);
        assert_eq!(tl.timeline[0].end, 5_000);
        assert_eq!(tl.timeline[1].start, 4_500);
        assert_eq!(tl.timeline[1].end, 9_500);
        assert_eq!(tl.timeline[2].start, 9_000);
        assert_eq!(tl.total_duration, 14_000);
        assert!(tl.timeline[2].transition.is_none());
    }

    #[test]
    fn test_cut_has_no_overlap() {
        let g = graph(vec![
            scene(1, 5_000, TransitionType::Cut),
            scene(2, 5_000, TransitionType::Fade),
        ]);
        let tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();

        assert_eq!(tl.timeline[0].transition.unwrap().duration, 0);
        assert_eq!(tl.timeline[1].start, 5_000);
        assert_eq!(tl.total_duration, 10_000);
    }

    #[test]
    fn test_captions_carry_insets_and_scene_ids() {
        let g = graph(vec![scene(1, 5_000, TransitionType::Fade)]);
        let tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();

        let cap = &tl.tracks.captions[0];
        assert_eq!(cap.scene_id, Some(1));
        assert_eq!(cap.start, 200);
        assert_eq!(cap.end, 4_800);
    }

    #[test]
    fn test_short_scene_caption_falls_back_to_full_window() {
        let mut s = scene(1, 1_000, TransitionType::Fade);
        s.duration = 1_000;
        // A 300ms window would invert after the 200ms insets.
        let g = graph(vec![s]);
        let mut tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();
        let cap = tl.tracks.captions.remove(0);
        assert!(cap.end > cap.start);
    }

    #[test]
    fn test_audio_tracks_follow_global_audio() {
        let scenes = vec![scene(1, 5_000, TransitionType::Fade)];
        let g = SceneGraph::new(
            scenes,
            GlobalAudio {
                voice_script: Some("Hello there.".into()),
                voice_file: None,
                background_music: Some("calm_pulse".into()),
            },
        )
        .unwrap();
        let tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();

        assert_eq!(tl.tracks.audio.len(), 2);
        let music = tl
            .tracks
            .audio
            .iter()
            .find(|t| t.kind == AudioTrackKind::Music)
            .unwrap();
        assert_eq!(music.volume, 0.5);
        assert_eq!(music.end, Some(tl.total_duration));
    }

    #[test]
    fn test_overlays_stack_above_layer_zero() {
        let mut s = scene(1, 5_000, TransitionType::Fade);
        s.media = SceneMedia::Image {
            asset: Some("uploads/u/p.png".into()),
            effect: Some(VisualEffect::KenBurnsZoom),
        };
        s.overlays.push(crate::scene_graph::SceneOverlay {
            kind: crate::scene_graph::OverlayType::Logo,
            asset: "logo.png".into(),
            position: crate::scene_graph::OverlayPosition::TopRight,
            scale: 0.5,
            opacity: 0.8,
        });
        let g = graph(vec![s]);
        let tl = build_timeline(&g, DEFAULT_TRANSITION_MS).unwrap();

        assert_eq!(tl.tracks.video.len(), 2);
        assert_eq!(tl.tracks.video[0].layer, 0);
        assert_eq!(tl.tracks.video[0].effect.as_deref(), Some("ken_burns_zoom"));
        assert_eq!(tl.tracks.video[1].layer, 1);
    }

    #[test]
    fn test_proportional_reduce_fits_cap_with_positive_spans() {
        // Durations only reachable pre-validation; the reducer must bring
        // them under the cap while keeping every span positive.
        let scenes = vec![
            scene(1, 40_000, TransitionType::Fade),
            scene(2, 40_000, TransitionType::Fade),
            scene(3, 40_000, TransitionType::Fade),
        ];
        let entries = proportional_reduce(&scenes, DEFAULT_TRANSITION_MS, 119_000);

        let total = entries.last().unwrap().end;
        assert!(total <= MAX_TOTAL_DURATION_MS, "total {total}");
        for entry in &entries {
            assert!(entry.end > entry.start);
        }
        for pair in entries.windows(2) {
            assert!(pair[1].start + pair[0].transition_ms() >= pair[0].end);
        }
    }
}
