//! Run configuration. The CLI parses into these structs; each one builds its
//! pipeline by handing explicit configs and clients to component constructors.

use crate::audio::{codec_for, FfmpegCodec};
use crate::error::{Result, TranscribeError};
use crate::export::{BidiFormatter, DisplayFormatter, OutputFormat, Passthrough};
use crate::pipeline::{CloudPipeline, LocalPipeline};
use crate::segmenter::{mb_to_bytes, Segmenter, SizePolicy};
use crate::staging::{GcsStore, Stager, StagingConfig, StorageConfig};
use crate::transcription::{
    GoogleSpeechBackend, LongRunningConfig, RecognitionConfig, RemoteTranscriptionConfig,
    WhisperApiBackend, DEFAULT_TRANSCRIPTIONS_URL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_CHUNK_SIZE_MB: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct LocalRunConfig {
    pub chunk_size_mb: f64,
    pub api: RemoteTranscriptionConfig,
    pub concurrency: usize,
    pub size_policy: SizePolicy,
    /// Chunk directory; next to the source when unset.
    pub output_dir: Option<PathBuf>,
    pub ffmpeg: FfmpegCodec,
}

impl Default for LocalRunConfig {
    fn default() -> Self {
        Self {
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            api: RemoteTranscriptionConfig::default(),
            concurrency: 1,
            size_policy: SizePolicy::Estimate,
            output_dir: None,
            ffmpeg: FfmpegCodec::default(),
        }
    }
}

impl LocalRunConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.chunk_size_mb.is_finite() || self.chunk_size_mb <= 0.0 {
            return Err(TranscribeError::Config(format!(
                "chunk size must be a positive number of MB, got {}",
                self.chunk_size_mb
            )));
        }
        if self.concurrency == 0 {
            return Err(TranscribeError::Config("concurrency must be at least 1".into()));
        }
        if self.api.base_url.is_empty() {
            return Err(TranscribeError::Config("transcription API URL is empty".into()));
        }
        if self.api.base_url == DEFAULT_TRANSCRIPTIONS_URL && self.api.api_key.is_none() {
            return Err(TranscribeError::Config(
                "an API key is required for the OpenAI endpoint (set OPENAI_API_KEY)".into(),
            ));
        }
        Ok(())
    }

    /// Build the pipeline for `source`. The codec is picked from its extension.
    pub fn pipeline_for(&self, source: &Path) -> Result<LocalPipeline> {
        self.validate()?;
        let mut segmenter = Segmenter::new(
            codec_for(source, &self.ffmpeg),
            mb_to_bytes(self.chunk_size_mb),
        )
        .with_policy(self.size_policy);
        if let Some(ref dir) = self.output_dir {
            segmenter = segmenter.with_output_dir(dir.clone());
        }
        let backend = Arc::new(WhisperApiBackend::new(self.api.clone()));
        Ok(LocalPipeline::new(segmenter, backend).with_concurrency(self.concurrency))
    }
}

#[derive(Debug, Clone)]
pub struct CloudRunConfig {
    pub staging: StagingConfig,
    pub storage: StorageConfig,
    pub speech: LongRunningConfig,
    pub recognition: RecognitionConfig,
    pub format: OutputFormat,
    /// Reorder right-to-left text for display.
    pub bidi: bool,
    pub ffmpeg: FfmpegCodec,
}

impl Default for CloudRunConfig {
    fn default() -> Self {
        Self {
            staging: StagingConfig::default(),
            storage: StorageConfig::default(),
            speech: LongRunningConfig::default(),
            recognition: RecognitionConfig::default(),
            format: OutputFormat::Text,
            bidi: true,
            ffmpeg: FfmpegCodec::default(),
        }
    }
}

impl CloudRunConfig {
    /// Same bearer token for storage and speech.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.storage.access_token = token.clone();
        self.speech.access_token = token;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.staging.bucket.trim().is_empty() {
            return Err(TranscribeError::Config("bucket name is empty".into()));
        }
        if self.recognition.channel_count == 0 {
            return Err(TranscribeError::Config("channel count must be at least 1".into()));
        }
        if self.storage.access_token.is_none() {
            return Err(TranscribeError::Config(
                "an access token is required for cloud storage (set GOOGLE_ACCESS_TOKEN)".into(),
            ));
        }
        if self.speech.access_token.is_none() && self.speech.api_key.is_none() {
            return Err(TranscribeError::Config(
                "speech API needs an access token or an API key".into(),
            ));
        }
        if self.speech.poll_interval.is_zero() {
            return Err(TranscribeError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    pub fn pipeline(&self) -> Result<CloudPipeline> {
        self.validate()?;
        let client = reqwest::Client::new();
        let stager = Stager::new(
            Arc::new(self.ffmpeg.clone()),
            Arc::new(GcsStore::with_client(client.clone(), self.storage.clone())),
            self.staging.clone(),
        );
        let backend = Arc::new(GoogleSpeechBackend::with_client(client, self.speech.clone()));
        let formatter: Arc<dyn DisplayFormatter> = if self.bidi {
            Arc::new(BidiFormatter)
        } else {
            Arc::new(Passthrough)
        };
        Ok(CloudPipeline::new(stager, backend)
            .with_recognition_config(self.recognition.clone())
            .with_format(self.format)
            .with_formatter(formatter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults_need_key_for_openai() {
        let config = LocalRunConfig::default();
        assert!(matches!(config.validate(), Err(TranscribeError::Config(_))));

        let mut config = LocalRunConfig::default();
        config.api.api_key = Some("sk-test".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_self_hosted_without_key() {
        let config = LocalRunConfig {
            api: RemoteTranscriptionConfig::new(
                "http://localhost:8000/v1/audio/transcriptions".into(),
                "whisper-1".into(),
                None,
            ),
            ..LocalRunConfig::default()
        };
        assert!(config.pipeline_for(Path::new("a.wav")).is_ok());
    }

    #[test]
    fn test_local_rejects_bad_chunk_size() {
        for mb in [0.0, -1.0, f64::NAN] {
            let mut config = LocalRunConfig::default();
            config.api.api_key = Some("k".into());
            config.chunk_size_mb = mb;
            assert!(matches!(config.validate(), Err(TranscribeError::Config(_))));
        }
    }

    #[test]
    fn test_cloud_requires_token() {
        let config = CloudRunConfig::default();
        assert!(matches!(config.validate(), Err(TranscribeError::Config(_))));
        let config = CloudRunConfig::default().with_access_token(Some("ya29.token".into()));
        assert!(config.pipeline().is_ok());
    }

    #[test]
    fn test_cloud_defaults() {
        let config = CloudRunConfig::default();
        assert_eq!(config.staging.bucket, "demo-speechless");
        assert_eq!(config.staging.blob_path, "demo/audio-files/");
        assert_eq!(config.recognition.language_code, "he-IL");
        assert_eq!(config.recognition.channel_count, 2);
        assert!(config.bidi);
    }
}
