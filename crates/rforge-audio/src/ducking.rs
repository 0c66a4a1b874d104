//! Music ducking under voice.
//!
//! Duck regions come from voice-active spans, padded and merged; the
//! envelope reduces music by 12 dB inside each region with 200 ms linear
//! fades on both sides.

use std::path::Path;
use tracing::info;

use rforge_media::{apply_audio_filter, db_to_gain};
use rforge_models::DuckRegion;

use crate::error::AudioResult;

/// Default reduction applied inside a duck region, dB.
pub const DUCK_AMOUNT_DB: f64 = -12.0;

/// Padding added around each voice span before merging.
pub const DUCK_PAD_MS: u64 = 100;

/// Fade length on each side of a region, seconds.
pub const DUCK_FADE_S: f64 = 0.2;

/// Build duck regions from voice-active spans: pad each span by
/// [`DUCK_PAD_MS`] and merge overlapping results.
pub fn detect_duck_regions(voice_spans: &[(u64, u64)], duck_amount_db: f64) -> Vec<DuckRegion> {
    if voice_spans.is_empty() {
        return Vec::new();
    }

    let mut spans: Vec<(u64, u64)> = voice_spans.to_vec();
    spans.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<(u64, u64)> = Vec::new();
    for (start, end) in spans {
        let padded_start = start.saturating_sub(DUCK_PAD_MS);
        let padded_end = end + DUCK_PAD_MS;
        match merged.last_mut() {
            Some((_, last_end)) if padded_start <= *last_end => {
                *last_end = (*last_end).max(padded_end);
            }
            _ => merged.push((padded_start, padded_end)),
        }
    }

    let regions: Vec<DuckRegion> = merged
        .into_iter()
        .map(|(start, end)| DuckRegion {
            start,
            end,
            duck_amount: duck_amount_db,
            fade_in: DUCK_FADE_S,
            fade_out: DUCK_FADE_S,
        })
        .collect();

    info!(count = regions.len(), "duck regions detected");
    regions
}

/// Per-region gain envelope: ducked gain inside the region, linear ramps
/// over the fade windows, unity elsewhere.
fn region_envelope(region: &DuckRegion) -> String {
    let start = region.start as f64 / 1000.0;
    let end = region.end as f64 / 1000.0;
    let gain = db_to_gain(region.duck_amount);
    let fade_in_start = (start - region.fade_in).max(0.0);
    let fade_out_end = end + region.fade_out;

    format!(
        "volume=volume='if(between(t,{start:.3},{end:.3}),{gain:.4},\
if(between(t,{fade_in_start:.3},{start:.3}),1-(1-{gain:.4})*(t-{fade_in_start:.3})/{fade:.3},\
if(between(t,{end:.3},{fade_out_end:.3}),{gain:.4}+(1-{gain:.4})*(t-{end:.3})/{fade:.3},1)))':eval=frame",
        fade = region.fade_in.max(0.001),
    )
}

/// Apply a ducking envelope to a music track.
pub async fn apply_ducking(
    music: &Path,
    output: &Path,
    regions: &[DuckRegion],
) -> AudioResult<()> {
    if regions.is_empty() {
        apply_audio_filter(music, output, "anull", None).await?;
        return Ok(());
    }

    let filter = regions
        .iter()
        .map(region_envelope)
        .collect::<Vec<_>>()
        .join(",");
    apply_audio_filter(music, output, &filter, None).await?;

    info!(regions = regions.len(), output = %output.display(), "ducking applied");
    Ok(())
}
