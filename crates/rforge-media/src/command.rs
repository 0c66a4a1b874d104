//! FFmpeg command builder and runner.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Default subprocess timeout for composition-class operations.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone)]
struct Input {
    /// Arguments placed before this input's `-i`.
    args: Vec<String>,
    /// The `-i` operand: a file path or a lavfi source spec.
    source: String,
}

/// Builder for multi-input ffmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.into(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "warning".to_string(),
        }
    }

    /// Add a plain file input.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(Input {
            args: Vec::new(),
            source: path.into().to_string_lossy().into_owned(),
        });
        self
    }

    /// Add an input preceded by extra arguments (e.g. `-loop 1`).
    pub fn input_with_args<I, S>(mut self, args: I, path: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(Input {
            args: args.into_iter().map(Into::into).collect(),
            source: path.into().to_string_lossy().into_owned(),
        });
        self
    }

    /// Add a lavfi virtual input (color/anullsrc sources).
    pub fn lavfi(mut self, spec: impl Into<String>) -> Self {
        self.inputs.push(Input {
            args: vec!["-f".to_string(), "lavfi".to_string()],
            source: spec.into(),
        });
        self
    }

    /// Add an output-side argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output-side arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the video filter chain.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Set the audio filter chain.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.arg("-af").arg(filter)
    }

    /// Set a filter-complex graph.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.arg("-filter_complex").arg(filter)
    }

    /// Map a labelled stream into the output.
    pub fn map(self, stream: impl Into<String>) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Set the video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set the audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set the pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.arg("-pix_fmt").arg(format)
    }

    /// Set the output frame rate.
    pub fn fps(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// Clamp output duration in seconds.
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{seconds:.3}"))
    }

    /// Seek before decoding the first input (thumbnail extraction).
    pub fn seek(mut self, seconds: f64) -> Self {
        if let Some(first) = self.inputs.first_mut() {
            first.args.push("-ss".to_string());
            first.args.push(format!("{seconds:.3}"));
        }
        self
    }

    /// Emit a single frame.
    pub fn single_frame(self) -> Self {
        self.arg("-frames:v").arg("1")
    }

    /// Move the moov atom up front for streaming starts.
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Override the ffmpeg log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the final argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-hide_banner".to_string());
        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runner for ffmpeg commands with a hard subprocess timeout.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    timeout_secs: u64,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Run an ffmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!(cmd = %args.join(" "), "running ffmpeg");

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let wait = child.wait_with_output();
        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), wait)
            .await
            .map_err(|_| MediaError::Timeout(self.timeout_secs))??;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.chars().rev().take(2000).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                Some(tail),
                output.status.code(),
            ))
        }
    }
}

/// Check that ffmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check that ffprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
