//! Caption alignment with degrading fallback.
//!
//! Tries configured aligners (word-level, then sentence-level) and falls
//! back to an even-time split inside each scene. Output captions carry
//! their owning scene id and a confidence.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use rforge_models::planner::split_sentences;

/// Caption pad inside a scene window for one-sentence scenes.
const SCENE_PAD_MS: u64 = 200;

/// Inset for even-time splits within a scene.
const SPLIT_INSET_MS: u64 = 100;

/// A caption with resolved timing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedCaption {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub scene_id: Option<u32>,
    pub confidence: f64,
}

/// How the captions were aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMethod {
    Word,
    Sentence,
    EvenSplit,
}

/// Alignment output.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub captions: Vec<AlignedCaption>,
    pub method: AlignmentMethod,
}

/// An external forced-alignment backend. Returning `None` degrades to the
/// next aligner (and finally to the even-time split).
#[async_trait]
pub trait Aligner: Send + Sync {
    fn name(&self) -> &'static str;

    fn method(&self) -> AlignmentMethod;

    async fn align(
        &self,
        audio: &Path,
        transcript: &str,
        scene_bounds: &[(u32, u64, u64)],
    ) -> Option<Vec<AlignedCaption>>;
}

/// Produce timed captions from audio + transcript.
///
/// `scene_bounds` is `(scene_id, start_ms, end_ms)` from the timeline.
pub async fn align_captions(
    aligners: &[Arc<dyn Aligner>],
    audio: Option<&Path>,
    transcript: &str,
    scene_bounds: &[(u32, u64, u64)],
) -> AlignmentResult {
    if let Some(audio) = audio.filter(|p| p.exists()) {
        for aligner in aligners {
            match aligner.align(audio, transcript, scene_bounds).await {
                Some(captions) if !captions.is_empty() => {
                    info!(aligner = aligner.name(), captions = captions.len(), "alignment succeeded");
                    return AlignmentResult {
                        captions,
                        method: aligner.method(),
                    };
                }
                _ => warn!(aligner = aligner.name(), "aligner unavailable, degrading"),
            }
        }
    }

    even_time_split(transcript, scene_bounds)
}

/// Fallback: distribute sentences across scenes, splitting scene windows
/// evenly when a scene owns several sentences.
pub fn even_time_split(transcript: &str, scene_bounds: &[(u32, u64, u64)]) -> AlignmentResult {
    let sentences = split_sentences(transcript);
    if sentences.is_empty() || scene_bounds.is_empty() {
        return AlignmentResult {
            captions: Vec::new(),
            method: AlignmentMethod::EvenSplit,
        };
    }

    let n_scenes = scene_bounds.len();
    let n_sentences = sentences.len();
    let mut captions = Vec::new();

    if n_sentences <= n_scenes {
        for (i, sentence) in sentences.iter().enumerate() {
            let (scene_id, s_start, s_end) = scene_bounds[i];
            let mut start = s_start + SCENE_PAD_MS;
            let mut end = s_end.saturating_sub(SCENE_PAD_MS);
            if end <= start {
                start = s_start;
                end = s_end;
            }
            captions.push(AlignedCaption {
                text: sentence.clone(),
                start_ms: start,
                end_ms: end,
                scene_id: Some(scene_id),
                confidence: 0.5,
            });
        }
    } else {
        let per_scene = n_sentences as f64 / n_scenes as f64;
        let mut cursor = 0.0f64;

        for (i, (scene_id, s_start, s_end)) in scene_bounds.iter().enumerate() {
            let next = cursor + per_scene;
            let start_i = cursor as usize;
            let end_i = if i == n_scenes - 1 {
                n_sentences
            } else {
                (next as usize).min(n_sentences)
            };
            cursor = next;

            let scene_sentences = &sentences[start_i..end_i];
            if scene_sentences.is_empty() {
                continue;
            }

            let window = s_end.saturating_sub(*s_start);
            let per_sentence = window / scene_sentences.len() as u64;

            for (j, sentence) in scene_sentences.iter().enumerate() {
                let mut start = s_start + per_sentence * j as u64 + SPLIT_INSET_MS;
                let mut end =
                    (s_start + per_sentence * (j as u64 + 1)).saturating_sub(SPLIT_INSET_MS);
                if end <= start {
                    start = s_start + per_sentence * j as u64;
                    end = start + 500;
                }
                captions.push(AlignedCaption {
                    text: sentence.clone(),
                    start_ms: start,
                    end_ms: end,
                    scene_id: Some(*scene_id),
                    confidence: 0.5,
                });
            }
        }
    }

    info!(captions = captions.len(), "even-time split alignment");
    AlignmentResult {
        captions,
        method: AlignmentMethod::EvenSplit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_aligners_degrades_to_even_split() {
        let result = align_captions(
            &[],
            None,
            "Hello there. Second line.",
            &[(1, 0, 5_000), (2, 5_000, 10_000)],
        )
        .await;
        assert_eq!(result.method, AlignmentMethod::EvenSplit);
        assert_eq!(result.captions.len(), 2);
    }

    #[test]
    fn test_one_sentence_per_scene_padding() {
        let result = even_time_split("Hello there.", &[(1, 0, 5_000)]);
        let cap = &result.captions[0];
        assert_eq!(cap.scene_id, Some(1));
        assert_eq!(cap.start_ms, 200);
        assert_eq!(cap.end_ms, 4_800);
    }

    #[test]
    fn test_multiple_sentences_split_scene_window() {
        let result = even_time_split(
            "One. Two. Three. Four.",
            &[(1, 0, 4_000), (2, 4_000, 8_000)],
        );
        assert_eq!(result.captions.len(), 4);

        // Two sentences per scene, each in an inset half-window.
        assert_eq!(result.captions[0].start_ms, 100);
        assert_eq!(result.captions[0].end_ms, 1_900);
        assert_eq!(result.captions[1].start_ms, 2_100);
        assert_eq!(result.captions[1].end_ms, 3_900);
        assert_eq!(result.captions[2].scene_id, Some(2));
        assert_eq!(result.captions[2].start_ms, 4_100);
    }

    #[test]
    fn test_captions_stay_within_scene_bounds() {
        let bounds = [(1, 0, 3_000), (2, 3_000, 9_000)];
        let result = even_time_split("A one. B two. C three. D four. E five.", &bounds);
        for cap in &result.captions {
            let (_, s_start, s_end) = bounds
                .iter()
                .find(|(id, _, _)| Some(*id) == cap.scene_id)
                .unwrap();
            assert!(cap.start_ms >= *s_start);
            assert!(cap.end_ms <= *s_end);
            assert!(cap.end_ms > cap.start_ms);
        }
    }

    #[test]
    fn test_empty_transcript_yields_no_captions() {
        let result = even_time_split("", &[(1, 0, 5_000)]);
        assert!(result.captions.is_empty());
    }
}
