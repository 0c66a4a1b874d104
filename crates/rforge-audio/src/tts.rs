//! TTS voiceover generation with provider fallback.
//!
//! Providers are tried in configured order; the terminal stage synthesizes
//! a silent stereo track proportional to the script length, so voiceover
//! acquisition never returns empty-handed.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use rforge_media::{audio_duration, silence_track};
use rforge_models::TtsConfig;

use crate::error::{AudioError, AudioResult};

/// Average speech rate used for estimates.
const WORDS_PER_SECOND: f64 = 2.5;

/// A generated voiceover.
#[derive(Debug, Clone)]
pub struct TtsOutcome {
    pub audio_path: PathBuf,
    pub duration_ms: u64,
    pub provider: String,
}

/// Estimated speech time for a script, floor 3 seconds.
pub fn estimate_speech_seconds(script: &str) -> f64 {
    let words = script.split_whitespace().count();
    (words as f64 / WORDS_PER_SECOND).max(3.0)
}

/// Generate a voiceover for `script`, trying providers in order:
/// primary, backup, local, silence fallback.
pub async fn generate_voiceover(
    script: &str,
    output_dir: &Path,
    config: &TtsConfig,
) -> AudioResult<TtsOutcome> {
    tokio::fs::create_dir_all(output_dir).await?;

    let mut providers = vec![
        config.primary_provider.as_str(),
        config.backup_provider.as_str(),
        "local",
    ];
    providers.dedup();

    for provider in providers {
        info!(provider, script_len = script.len(), "tts attempt");
        match generate_with_provider(provider, script, output_dir, config).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => warn!(provider, error = %e, "tts provider failed"),
        }
    }

    silence_fallback(script, output_dir).await
}

async fn generate_with_provider(
    provider: &str,
    script: &str,
    output_dir: &Path,
    config: &TtsConfig,
) -> AudioResult<TtsOutcome> {
    match provider {
        "elevenlabs" => elevenlabs(script, output_dir, config).await,
        "openai" => openai(script, output_dir, config).await,
        "local" => Err(AudioError::Tts(
            "no local synthesizer installed".to_string(),
        )),
        other => Err(AudioError::Tts(format!("unknown TTS provider: {other}"))),
    }
}

async fn elevenlabs(
    script: &str,
    output_dir: &Path,
    config: &TtsConfig,
) -> AudioResult<TtsOutcome> {
    let api_key = std::env::var("ELEVENLABS_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        return Err(AudioError::Tts("ELEVENLABS_API_KEY not set".to_string()));
    }

    let voice_id = if config.voice_name == "default" {
        "21m00Tcm4TlvDq8ikWAM"
    } else {
        config.voice_name.as_str()
    };
    let output_path = output_dir.join(format!("voiceover_elevenlabs.{}", config.output_format));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| AudioError::Tts(e.to_string()))?;
    let response = client
        .post(format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{voice_id}"
        ))
        .header("xi-api-key", &api_key)
        .header("Accept", format!("audio/{}", config.output_format))
        .json(&serde_json::json!({
            "text": script,
            "model_id": "eleven_monolingual_v1",
            "voice_settings": {"stability": 0.5, "similarity_boost": 0.75},
        }))
        .send()
        .await
        .map_err(|e| AudioError::Tts(format!("elevenlabs request: {e}")))?;

    if !response.status().is_success() {
        return Err(AudioError::Tts(format!(
            "elevenlabs returned {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AudioError::Tts(format!("elevenlabs read: {e}")))?;
    tokio::fs::write(&output_path, &bytes).await?;

    let duration_ms = (audio_duration(&output_path).await? * 1000.0) as u64;
    Ok(TtsOutcome {
        audio_path: output_path,
        duration_ms,
        provider: "elevenlabs".to_string(),
    })
}

async fn openai(script: &str, output_dir: &Path, config: &TtsConfig) -> AudioResult<TtsOutcome> {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        return Err(AudioError::Tts("OPENAI_API_KEY not set".to_string()));
    }

    let voice = if config.voice_name == "default" {
        "alloy"
    } else {
        config.voice_name.as_str()
    };
    let output_path = output_dir.join(format!("voiceover_openai.{}", config.output_format));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| AudioError::Tts(e.to_string()))?;
    let response = client
        .post("https://api.openai.com/v1/audio/speech")
        .bearer_auth(&api_key)
        .json(&serde_json::json!({
            "model": "tts-1",
            "input": script,
            "voice": voice,
            "speed": config.speed,
            "response_format": config.output_format,
        }))
        .send()
        .await
        .map_err(|e| AudioError::Tts(format!("openai request: {e}")))?;

    if !response.status().is_success() {
        return Err(AudioError::Tts(format!(
            "openai returned {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AudioError::Tts(format!("openai read: {e}")))?;
    tokio::fs::write(&output_path, &bytes).await?;

    let duration_ms = (audio_duration(&output_path).await? * 1000.0) as u64;
    Ok(TtsOutcome {
        audio_path: output_path,
        duration_ms,
        provider: "openai".to_string(),
    })
}

/// Last resort: a silent stereo track sized to the script so the pipeline
/// always has a voiceover-shaped input.
async fn silence_fallback(script: &str, output_dir: &Path) -> AudioResult<TtsOutcome> {
    let duration_seconds = estimate_speech_seconds(script);
    let output_path = output_dir.join("voiceover_silence.wav");

    silence_track(&output_path, duration_seconds).await?;
    info!(duration_seconds, "synthesized silence voiceover fallback");

    Ok(TtsOutcome {
        audio_path: output_path,
        duration_ms: (duration_seconds * 1000.0) as u64,
        provider: "silence_fallback".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_estimate_follows_word_count() {
        // 25 words at 2.5 words/s is 10 seconds.
        let script = "word ".repeat(25);
        assert!((estimate_speech_seconds(&script) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_speech_estimate_floor() {
        assert!((estimate_speech_seconds("hi") - 3.0).abs() < 1e-9);
        assert!((estimate_speech_seconds("") - 3.0).abs() < 1e-9);
    }
}
