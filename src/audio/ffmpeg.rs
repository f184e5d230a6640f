//! ffmpeg / ffprobe sidecar codec.

use super::{AudioCodec, AudioSource, Transcoder};
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct FfmpegCodec {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl FfmpegCodec {
    pub fn new(ffmpeg_path: Option<String>, ffprobe_path: Option<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe_path: ffprobe_path.unwrap_or_else(|| "ffprobe".to_string()),
        }
    }

    /// Run ffmpeg with `args`, returning stderr on a non-zero exit.
    async fn run_ffmpeg(&self, args: &[&str]) -> std::result::Result<(), String> {
        debug!("[ffmpeg] {} {}", self.ffmpeg_path, args.join(" "));
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .output()
            .await
            .map_err(|e| format!("Failed to run {}: {}", self.ffmpeg_path, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output into
/// `(duration_secs, sample_rate, channels)`.
fn parse_probe(json: &str) -> std::result::Result<(f64, Option<u32>, Option<u16>), String> {
    let probe: ProbeOutput = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or("unknown or zero duration")?;
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));
    let sample_rate = audio
        .and_then(|s| s.sample_rate.as_deref())
        .and_then(|r| r.parse().ok());
    let channels = audio.and_then(|s| s.channels);
    Ok((duration, sample_rate, channels))
}

fn secs_arg(secs: f64) -> String {
    ms_arg(to_ms(secs))
}

fn to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

fn ms_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// `-ss` and `-t` values for `[start_secs, end_secs)`. Both bounds are rounded
/// to the millisecond first, so a chunk ending at `x` and the next one starting
/// at `x` meet exactly.
fn range_args(start_secs: f64, end_secs: f64) -> (String, String) {
    let start = to_ms(start_secs);
    let end = to_ms(end_secs).max(start);
    (ms_arg(start), ms_arg(end - start))
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    fn id(&self) -> &'static str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<AudioSource> {
        let metadata =
            std::fs::metadata(path).map_err(|e| TranscribeError::source_unreadable(path, e))?;
        if metadata.len() == 0 {
            return Err(TranscribeError::source_unreadable(path, "empty file"));
        }
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                TranscribeError::source_unreadable(
                    path,
                    format!("Failed to run {}: {}", self.ffprobe_path, e),
                )
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::source_unreadable(path, stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let (duration_secs, sample_rate, channels) =
            parse_probe(&stdout).map_err(|e| TranscribeError::source_unreadable(path, e))?;
        Ok(AudioSource {
            path: path.to_path_buf(),
            duration_secs,
            total_bytes: metadata.len(),
            sample_rate,
            channels,
        })
    }

    async fn extract(
        &self,
        source: &AudioSource,
        start_secs: f64,
        end_secs: f64,
        output: &Path,
    ) -> Result<()> {
        let input = source.path.to_string_lossy();
        let out = output.to_string_lossy();
        let (start, length) = range_args(start_secs, end_secs);
        self.run_ffmpeg(&["-y", "-v", "error", "-ss", &start, "-i", &input, "-t", &length, &out])
            .await
            .map_err(|e| TranscribeError::encode_failure(output, e))
    }

    fn chunk_extension(&self, source: &AudioSource) -> String {
        source.extension().unwrap_or_else(|| "mp3".to_string())
    }
}

#[async_trait]
impl Transcoder for FfmpegCodec {
    fn target_extension(&self) -> &'static str {
        "flac"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let input_s = input.to_string_lossy();
        let out = output.to_string_lossy();
        self.run_ffmpeg(&["-y", "-v", "error", "-i", &input_s, "-c:a", "flac", &out])
            .await
            .map_err(|e| TranscribeError::ConversionFailure(format!("{}: {}", input.display(), e)))
    }
}
