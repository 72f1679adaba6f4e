use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::config::MediaSection;

/// Placeholder reported when a metadata field cannot be determined.
pub const UNKNOWN: &str = "Unknown";

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media command failed: {0}")]
    Command(String),
    #[error("media command timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid ffprobe payload: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for MediaError {
    fn from(source: serde_json::Error) -> Self {
        MediaError::Parse(source.to_string())
    }
}

/// Technical metadata of one video file, already rendered for display.
/// Fields degrade to [`UNKNOWN`] when the probe fails outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub duration: String,
    pub resolution: String,
    pub fps: String,
}

impl VideoMetadata {
    pub fn unknown() -> Self {
        Self {
            duration: UNKNOWN.to_string(),
            resolution: UNKNOWN.to_string(),
            fps: UNKNOWN.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeData {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Wraps the external probing and transcoding tools. Tool names are
/// configurable so tests can point at stubs.
#[derive(Debug, Clone)]
pub struct MediaProber {
    ffprobe: String,
    ffmpeg: String,
    probe_timeout: Duration,
    compress_timeout: Duration,
}

impl MediaProber {
    pub fn new(ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
            probe_timeout: Duration::from_secs(30),
            compress_timeout: Duration::from_secs(300),
        }
    }

    pub fn from_config(media: &MediaSection) -> Self {
        Self {
            ffprobe: media.ffprobe_bin.clone(),
            ffmpeg: media.ffmpeg_bin.clone(),
            probe_timeout: Duration::from_secs(media.probe_timeout_seconds),
            compress_timeout: Duration::from_secs(media.compress_timeout_seconds),
        }
    }

    /// Extracts display metadata for `path`. Never errors: probe failures
    /// of any kind degrade to all-[`UNKNOWN`] metadata.
    pub async fn describe(&self, path: &Path) -> VideoMetadata {
        match self.run_ffprobe(path).await {
            Ok(Some(data)) => metadata_from_probe(&data),
            Ok(None) => VideoMetadata::unknown(),
            Err(err) => {
                warn!(
                    file = %path.display(),
                    error = %err,
                    "ffprobe failed, reporting sentinel metadata"
                );
                VideoMetadata::unknown()
            }
        }
    }

    /// Re-encodes `input` into `output` with the fixed x264/aac profile.
    pub async fn compress(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .kill_on_drop(true)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c:v", "libx264", "-crf", "28", "-c:a", "aac", "-b:a", "128k"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let execution = timeout(self.compress_timeout, command.output());
        match execution.await {
            Ok(Ok(run)) if run.status.success() => Ok(()),
            Ok(Ok(run)) => {
                let stderr = String::from_utf8_lossy(&run.stderr);
                Err(MediaError::Command(format!(
                    "{} exited with {}: {}",
                    self.ffmpeg,
                    run.status,
                    stderr.trim()
                )))
            }
            Ok(Err(source)) => Err(MediaError::Io {
                path: input.to_path_buf(),
                source,
            }),
            Err(_) => Err(MediaError::Timeout(self.compress_timeout)),
        }
    }

    async fn run_ffprobe(&self, path: &Path) -> MediaResult<Option<FfprobeData>> {
        let mut command = Command::new(&self.ffprobe);
        command
            .kill_on_drop(true)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let future = timeout(self.probe_timeout, command.output());
        match future.await {
            Ok(Ok(output)) if output.status.success() => {
                let parsed: FfprobeData = serde_json::from_slice(&output.stdout)?;
                Ok(Some(parsed))
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("ffprobe returned non-zero status: {}", stderr.trim());
                Ok(None)
            }
            Ok(Err(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Ok(Err(source)) => Err(MediaError::Io {
                path: path.to_path_buf(),
                source,
            }),
            Err(_) => Err(MediaError::Timeout(self.probe_timeout)),
        }
    }
}

fn metadata_from_probe(data: &FfprobeData) -> VideoMetadata {
    let video = data
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));
    let duration = data
        .format
        .duration
        .as_deref()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(0.0);
    let width = video.and_then(|stream| stream.width).unwrap_or(0);
    let height = video.and_then(|stream| stream.height).unwrap_or(0);
    let fps = video
        .and_then(|stream| stream.r_frame_rate.as_deref())
        .and_then(parse_rational)
        .unwrap_or(0.0);
    VideoMetadata {
        duration: format!("{duration:.1}"),
        resolution: format!("{width}x{height}"),
        fps: format!("{fps:.1}"),
    }
}

/// Evaluates a frame-rate string such as `"30000/1001"` or `"29.97"` as a
/// plain rational. A zero denominator yields `None`.
fn parse_rational(value: &str) -> Option<f64> {
    if let Some((num, den)) = value.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    value.trim().parse().ok()
}
