//! In-process WAV probing and range extraction.

use super::{AudioCodec, AudioSource};
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

#[async_trait]
impl AudioCodec for WavCodec {
    fn id(&self) -> &'static str {
        "wav"
    }

    async fn probe(&self, path: &Path) -> Result<AudioSource> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || probe_wav(&owned))
            .await
            .map_err(|e| TranscribeError::source_unreadable(path, e))?
    }

    async fn extract(
        &self,
        source: &AudioSource,
        start_secs: f64,
        end_secs: f64,
        output: &Path,
    ) -> Result<()> {
        let input = source.path.clone();
        let out = output.to_path_buf();
        tokio::task::spawn_blocking(move || extract_range(&input, &out, start_secs, end_secs))
            .await
            .map_err(|e| TranscribeError::encode_failure(output, e))?
    }

    fn chunk_extension(&self, _source: &AudioSource) -> String {
        "wav".to_string()
    }
}

fn probe_wav(path: &Path) -> Result<AudioSource> {
    let reader = WavReader::open(path).map_err(|e| TranscribeError::source_unreadable(path, e))?;
    let spec = reader.spec();
    let frames = reader.duration();
    if spec.sample_rate == 0 || frames == 0 {
        return Err(TranscribeError::source_unreadable(path, "zero duration"));
    }
    let total_bytes = std::fs::metadata(path)
        .map_err(|e| TranscribeError::source_unreadable(path, e))?
        .len();
    Ok(AudioSource {
        path: path.to_path_buf(),
        duration_secs: frames as f64 / spec.sample_rate as f64,
        total_bytes,
        sample_rate: Some(spec.sample_rate),
        channels: Some(spec.channels),
    })
}

/// Copy frames `[start_secs, end_secs)` of `input_path` into a new WAV with the same spec.
pub fn extract_range(
    input_path: &Path,
    output_path: &Path,
    start_secs: f64,
    end_secs: f64,
) -> Result<()> {
    let mut reader =
        WavReader::open(input_path).map_err(|e| TranscribeError::source_unreadable(input_path, e))?;
    let spec = reader.spec();
    let total_frames = reader.duration();

    let start_frame = secs_to_frame(start_secs, spec.sample_rate).min(total_frames);
    let end_frame = secs_to_frame(end_secs, spec.sample_rate).min(total_frames);
    let sample_count = end_frame.saturating_sub(start_frame) as usize * spec.channels as usize;

    let fail = |e: hound::Error| TranscribeError::encode_failure(PathBuf::from(output_path), e);

    reader.seek(start_frame).map_err(|e| fail(e.into()))?;
    let mut writer = WavWriter::create(output_path, spec).map_err(fail)?;
    match spec.sample_format {
        SampleFormat::Int => {
            for s in reader.samples::<i32>().take(sample_count) {
                writer.write_sample(s.map_err(fail)?).map_err(fail)?;
            }
        }
        SampleFormat::Float => {
            for s in reader.samples::<f32>().take(sample_count) {
                writer.write_sample(s.map_err(fail)?).map_err(fail)?;
            }
        }
    }
    writer.finalize().map_err(fail)?;
    Ok(())
}

fn secs_to_frame(secs: f64, sample_rate: u32) -> u32 {
    (secs.max(0.0) * sample_rate as f64).round() as u32
}
