//! Transcription backend trait and types.

use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single recognized span. Offsets are in milliseconds from the start of
/// the submitted audio, when the backend reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub text: String,
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
}

impl Cue {
    pub fn untimed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_ms: None,
            end_ms: None,
        }
    }
}

/// Recognition settings sent along with the audio.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    pub language_code: String,
    pub encoding: String,
    pub channel_count: u16,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language_code: "he-IL".to_string(),
            encoding: "ENCODING_UNSPECIFIED".to_string(),
            channel_count: 2,
        }
    }
}

/// The audio a request carries: exactly one of inline bytes or a storage URI.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPayload {
    InlineBytes { file_name: String, bytes: Vec<u8> },
    StagedUri(String),
}

impl AudioPayload {
    /// Read a local file (usually a chunk artifact) into an inline payload.
    /// A missing or unreadable file is an `InvalidRequest`: the request
    /// cannot be built.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            TranscribeError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        Ok(AudioPayload::InlineBytes { file_name, bytes })
    }
}

/// Loose audio description where either field may be set, as callers build
/// it before submission. Converting it into an `AudioPayload` enforces that
/// exactly one is present.
#[derive(Debug, Clone, Default)]
pub struct RecognitionAudio {
    pub content: Option<Vec<u8>>,
    pub uri: Option<String>,
}

impl TryFrom<RecognitionAudio> for AudioPayload {
    type Error = TranscribeError;

    fn try_from(audio: RecognitionAudio) -> Result<Self> {
        match (audio.content, audio.uri) {
            (Some(bytes), None) => Ok(AudioPayload::InlineBytes {
                file_name: "audio".to_string(),
                bytes,
            }),
            (None, Some(uri)) => Ok(AudioPayload::StagedUri(uri)),
            (None, None) => Err(TranscribeError::InvalidRequest(
                "neither audio content nor a storage uri was provided".to_string(),
            )),
            (Some(_), Some(_)) => Err(TranscribeError::InvalidRequest(
                "audio content and storage uri are mutually exclusive".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Chunk this request answers; `None` for a single staged file.
    pub chunk_index: Option<usize>,
    pub audio: AudioPayload,
    pub config: RecognitionConfig,
}

impl TranscriptionRequest {
    pub fn inline(chunk_index: usize, audio: AudioPayload, config: RecognitionConfig) -> Self {
        Self {
            chunk_index: Some(chunk_index),
            audio,
            config,
        }
    }

    pub fn staged(uri: impl Into<String>, config: RecognitionConfig) -> Self {
        Self {
            chunk_index: None,
            audio: AudioPayload::StagedUri(uri.into()),
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    /// Formatted text returned verbatim (e.g. an SRT document).
    Text(String),
    /// Recognized spans in order.
    Cues(Vec<Cue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub chunk_index: Option<usize>,
    pub body: ResultBody,
}

impl TranscriptionResult {
    /// Body as plain text; cues become one line each.
    pub fn text(&self) -> String {
        match &self.body {
            ResultBody::Text(t) => t.clone(),
            ResultBody::Cues(cues) => cues
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn cues(&self) -> Vec<Cue> {
        match &self.body {
            ResultBody::Text(t) => vec![Cue::untimed(t.clone())],
            ResultBody::Cues(cues) => cues.clone(),
        }
    }
}

/// A remote recognition service. `submit` resolves only once the service has
/// produced a final answer, polling internally if the backend is asynchronous.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    async fn submit(&self, request: TranscriptionRequest) -> Result<TranscriptionResult>;
}
