//! Voice-to-scene mapping.
//!
//! Assigns transcript sentences to scenes in order and estimates per-scene
//! voice duration, either proportionally from a measured voice file or
//! from word count at ~2.5 words/s.

use tracing::info;

use rforge_models::planner::split_sentences;

/// Average speech rate used when no measured duration exists.
const WORDS_PER_SECOND: f64 = 2.5;

/// Minimum duration assigned to a voiced scene.
const MIN_SEGMENT_MS: u64 = 500;

/// A voice segment mapped to one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSegment {
    pub scene_id: u32,
    pub text: String,
    pub estimated_duration_ms: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Result of voice-to-scene mapping.
#[derive(Debug, Clone, Default)]
pub struct VoiceMapping {
    pub segments: Vec<VoiceSegment>,
    pub total_voice_duration_ms: u64,
    pub scenes_without_voice: Vec<u32>,
}

/// Map transcript sentences onto scenes.
///
/// `scenes` is `(scene_id, scene_duration_ms)` in graph order. With fewer
/// sentences than scenes, each sentence lands on one scene in order and the
/// rest get none; with more, sentences distribute proportionally by count.
pub fn map_voice_to_scenes(
    transcript: &str,
    scenes: &[(u32, u64)],
    voice_duration_ms: Option<u64>,
) -> VoiceMapping {
    let sentences = split_sentences(transcript);
    if sentences.is_empty() || scenes.is_empty() {
        return VoiceMapping {
            scenes_without_voice: scenes.iter().map(|(id, _)| *id).collect(),
            ..Default::default()
        };
    }

    let n_scenes = scenes.len();
    let n_sentences = sentences.len();

    // Sentence indices assigned to each scene, preserving order.
    let mut assignments: Vec<Vec<&str>> = vec![Vec::new(); n_scenes];
    if n_sentences <= n_scenes {
        for (i, sentence) in sentences.iter().enumerate() {
            assignments[i].push(sentence);
        }
    } else {
        let per_scene = n_sentences as f64 / n_scenes as f64;
        let mut cursor = 0.0f64;
        for (i, slot) in assignments.iter_mut().enumerate() {
            let next = cursor + per_scene;
            let start = cursor as usize;
            let end = if i == n_scenes - 1 {
                n_sentences
            } else {
                next as usize
            };
            for sentence in &sentences[start..end.min(n_sentences)] {
                slot.push(sentence);
            }
            cursor = next;
        }
    }

    let total_words: usize = sentences.iter().map(|s| s.split_whitespace().count()).sum();

    let mut segments = Vec::new();
    let mut scenes_without_voice = Vec::new();
    let mut cursor_ms: u64 = 0;

    for (i, (scene_id, scene_duration_ms)) in scenes.iter().enumerate() {
        let texts = &assignments[i];
        if texts.is_empty() {
            scenes_without_voice.push(*scene_id);
            continue;
        }

        let combined = texts.join(" ");
        let words = combined.split_whitespace().count();

        let mut estimate_ms = match voice_duration_ms {
            Some(voice_ms) if total_words > 0 => {
                ((words as f64 / total_words as f64) * voice_ms as f64) as u64
            }
            _ => ((words as f64 / WORDS_PER_SECOND) * 1000.0) as u64,
        };
        estimate_ms = estimate_ms.clamp(MIN_SEGMENT_MS, (*scene_duration_ms).max(MIN_SEGMENT_MS));

        segments.push(VoiceSegment {
            scene_id: *scene_id,
            text: combined,
            estimated_duration_ms: estimate_ms,
            start_ms: cursor_ms,
            end_ms: cursor_ms + estimate_ms,
        });
        cursor_ms += estimate_ms;
    }

    let total = segments.iter().map(|s| s.estimated_duration_ms).sum();
    info!(
        sentences = n_sentences,
        scenes = n_scenes,
        segments = segments.len(),
        total_voice_ms = total,
        "voice mapped to scenes"
    );

    VoiceMapping {
        segments,
        total_voice_duration_ms: total,
        scenes_without_voice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_sentence_per_scene_when_fewer() {
        let mapping = map_voice_to_scenes(
            "First. Second.",
            &[(1, 5_000), (2, 5_000), (3, 5_000)],
            None,
        );
        assert_eq!(mapping.segments.len(), 2);
        assert_eq!(mapping.segments[0].scene_id, 1);
        assert_eq!(mapping.segments[0].text, "First.");
        assert_eq!(mapping.segments[1].scene_id, 2);
        assert_eq!(mapping.scenes_without_voice, vec![3]);
    }

    #[test]
    fn test_sentences_distribute_when_more_than_scenes() {
        let mapping = map_voice_to_scenes(
            "A one. B two. C three. D four.",
            &[(1, 10_000), (2, 10_000)],
            None,
        );
        assert_eq!(mapping.segments.len(), 2);
        assert!(mapping.segments[0].text.contains("A one."));
        assert!(mapping.segments[0].text.contains("B two."));
        assert!(mapping.segments[1].text.contains("D four."));
        assert!(mapping.scenes_without_voice.is_empty());
    }

    #[test]
    fn test_duration_proportional_to_measured_voice() {
        // 2 + 6 words; 8 total over 8000ms of measured voice.
        let mapping = map_voice_to_scenes(
            "Short one. This second sentence has six words.",
            &[(1, 10_000), (2, 10_000)],
            Some(8_000),
        );
        assert_eq!(mapping.segments[0].estimated_duration_ms, 2_000);
        assert_eq!(mapping.segments[1].estimated_duration_ms, 6_000);
    }

    #[test]
    fn test_estimate_clamped_to_scene_duration() {
        let long = format!("{}.", "word ".repeat(50).trim());
        let mapping = map_voice_to_scenes(&long, &[(1, 3_000)], None);
        assert_eq!(mapping.segments[0].estimated_duration_ms, 3_000);
    }

    #[test]
    fn test_minimum_segment_duration() {
        let mapping = map_voice_to_scenes("Hi.", &[(1, 5_000)], Some(10));
        assert_eq!(mapping.segments[0].estimated_duration_ms, 500);
    }

    #[test]
    fn test_empty_transcript() {
        let mapping = map_voice_to_scenes("", &[(1, 5_000)], None);
        assert!(mapping.segments.is_empty());
        assert_eq!(mapping.scenes_without_voice, vec![1]);
    }

    #[test]
    fn test_segments_are_contiguous() {
        let mapping = map_voice_to_scenes(
            "One here. Two there. Three everywhere.",
            &[(1, 5_000), (2, 5_000), (3, 5_000)],
            None,
        );
        for pair in mapping.segments.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
    }
}
