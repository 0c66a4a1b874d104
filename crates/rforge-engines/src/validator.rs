//! Clip validation for engine-produced results.
//!
//! Applied to every Level-1 and Level-2 clip; a failure falls through to
//! the next fallback level exactly as an engine error would.

use std::path::Path;
use tracing::info;

use rforge_media::probe_media;

/// Validation thresholds.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub min_width: u32,
    pub min_height: u32,
    /// Acceptable deviation as a fraction of the requested duration.
    pub duration_tolerance: f64,
    pub max_file_size_mb: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_width: 720,
            min_height: 1280,
            duration_tolerance: 0.2,
            max_file_size_mb: 200.0,
        }
    }
}

/// Structured validation outcome.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub duration_seconds: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
    pub file_size_bytes: Option<u64>,
}

impl ValidationResult {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}

/// Validation capability used by the engine manager. The default
/// implementation probes the file via the media facade; tests substitute
/// cheaper checks.
#[async_trait::async_trait]
pub trait ClipValidator: Send + Sync {
    async fn validate(&self, clip_path: &Path, expected_duration_seconds: f64)
        -> ValidationResult;
}

/// Probe-backed validator with configurable limits.
#[derive(Debug, Clone, Default)]
pub struct ProbeValidator {
    pub limits: ValidationLimits,
}

#[async_trait::async_trait]
impl ClipValidator for ProbeValidator {
    async fn validate(
        &self,
        clip_path: &Path,
        expected_duration_seconds: f64,
    ) -> ValidationResult {
        validate_clip(clip_path, expected_duration_seconds, &self.limits).await
    }
}

/// Validate an engine-produced clip against the requested scene duration.
pub async fn validate_clip(
    clip_path: impl AsRef<Path>,
    expected_duration_seconds: f64,
    limits: &ValidationLimits,
) -> ValidationResult {
    let path = clip_path.as_ref();

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return ValidationResult::invalid("file does not exist"),
    };
    let file_size = metadata.len();
    if file_size == 0 {
        return ValidationResult::invalid("file is empty (0 bytes)");
    }

    let mut errors: Vec<String> = Vec::new();
    let max_bytes = (limits.max_file_size_mb * 1024.0 * 1024.0) as u64;
    if file_size > max_bytes {
        errors.push(format!(
            "file too large: {:.1}MB > {}MB",
            file_size as f64 / 1024.0 / 1024.0,
            limits.max_file_size_mb
        ));
    }

    let info = match probe_media(path).await {
        Ok(info) => info,
        Err(e) => {
            let mut result =
                ValidationResult::invalid(format!("probe failed, file may be corrupt: {e}"));
            result.file_size_bytes = Some(file_size);
            return result;
        }
    };

    if !info.has_video {
        let mut result = ValidationResult::invalid("no video stream found in file");
        result.file_size_bytes = Some(file_size);
        return result;
    }

    if expected_duration_seconds > 0.0 {
        let min = expected_duration_seconds * (1.0 - limits.duration_tolerance);
        let max = expected_duration_seconds * (1.0 + limits.duration_tolerance);
        if info.duration_seconds < min || info.duration_seconds > max {
            errors.push(format!(
                "duration {:.1}s outside {:.1}-{:.1}s",
                info.duration_seconds, min, max
            ));
        }
    }

    if info.width < limits.min_width || info.height < limits.min_height {
        errors.push(format!(
            "resolution {}x{} below minimum {}x{}",
            info.width, info.height, limits.min_width, limits.min_height
        ));
    }

    let result = ValidationResult {
        valid: errors.is_empty(),
        errors,
        duration_seconds: Some(info.duration_seconds),
        width: Some(info.width),
        height: Some(info.height),
        codec: Some(info.codec),
        file_size_bytes: Some(file_size),
    };

    info!(
        path = %path.display(),
        valid = result.valid,
        errors = ?result.errors,
        "clip validation"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_invalid() {
        let result =
            validate_clip("/nonexistent/clip.mp4", 5.0, &ValidationLimits::default()).await;
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["file does not exist"]);
    }

    #[tokio::test]
    async fn test_empty_file_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        tokio::fs::write(&path, b"").await.unwrap();

        let result = validate_clip(&path, 5.0, &ValidationLimits::default()).await;
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["file is empty (0 bytes)"]);
    }

    #[tokio::test]
    async fn test_garbage_file_fails_probe() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        tokio::fs::write(&path, b"not a video at all").await.unwrap();

        let result = validate_clip(&path, 5.0, &ValidationLimits::default()).await;
        assert!(!result.valid);
        assert_eq!(result.file_size_bytes, Some(18));
    }
}
