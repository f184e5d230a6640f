//! Local-chunk orchestrator: split, transcribe each chunk, join, clean up.

use super::PipelineState;
use crate::error::{Result, TranscribeError};
use crate::segmenter::{ChunkArtifact, Segmenter};
use crate::transcription::{
    AudioPayload, RecognitionConfig, TranscriptionBackend, TranscriptionRequest,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

pub struct LocalPipeline {
    segmenter: Segmenter,
    backend: Arc<dyn TranscriptionBackend>,
    recognition: RecognitionConfig,
    concurrency: usize,
}

impl LocalPipeline {
    pub fn new(segmenter: Segmenter, backend: Arc<dyn TranscriptionBackend>) -> Self {
        Self {
            segmenter,
            backend,
            recognition: RecognitionConfig::default(),
            concurrency: 1,
        }
    }

    pub fn with_recognition_config(mut self, config: RecognitionConfig) -> Self {
        self.recognition = config;
        self
    }

    /// Number of chunks submitted at once. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    fn enter(&self, state: PipelineState) {
        info!("[local] {}", state);
    }

    /// Transcribe `source_path` and return the joined transcript.
    ///
    /// Every chunk written for the run is deleted before returning, whether
    /// the run succeeded or not. A failed run returns no partial transcript.
    pub async fn run(&self, source_path: &Path) -> Result<String> {
        self.enter(PipelineState::Planning);
        let artifacts = match self.plan(source_path).await {
            Ok(a) => a,
            Err(e) => {
                self.enter(PipelineState::Failed(e.stage()));
                return Err(e);
            }
        };

        let outcome = self.transcribe_and_join(&artifacts).await;

        self.enter(PipelineState::CleaningUp);
        cleanup(&artifacts);

        match outcome {
            Ok(transcript) => {
                self.enter(PipelineState::Done);
                Ok(transcript)
            }
            Err(e) => {
                self.enter(PipelineState::Failed(e.stage()));
                Err(e)
            }
        }
    }

    async fn plan(&self, source_path: &Path) -> Result<Vec<ChunkArtifact>> {
        let source = self.segmenter.codec().probe(source_path).await?;
        self.segmenter.plan_and_materialize(&source).await
    }

    async fn transcribe_and_join(&self, artifacts: &[ChunkArtifact]) -> Result<String> {
        let total = artifacts.len();
        let mut parts: Vec<(usize, String)> = stream::iter(artifacts.iter())
            .map(|artifact| self.transcribe_chunk(artifact, total))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        self.enter(PipelineState::Joining);
        parts.sort_by_key(|(index, _)| *index);
        Ok(parts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn transcribe_chunk(
        &self,
        artifact: &ChunkArtifact,
        total: usize,
    ) -> Result<(usize, String)> {
        self.enter(PipelineState::Transcribing {
            chunk: artifact.index,
            of: total,
        });
        let audio = AudioPayload::from_file(&artifact.path)?;
        let request = TranscriptionRequest::inline(artifact.index, audio, self.recognition.clone());
        let result = self.backend.submit(request).await?;
        match result.chunk_index {
            Some(i) if i != artifact.index => Err(TranscribeError::BackendError {
                status: 0,
                message: format!(
                    "{} answered chunk {} for chunk {}",
                    self.backend.id(),
                    i,
                    artifact.index
                ),
            }),
            _ => Ok((artifact.index, result.text())),
        }
    }
}

/// Best-effort removal of every artifact of the run.
fn cleanup(artifacts: &[ChunkArtifact]) {
    for artifact in artifacts {
        if let Err(e) = std::fs::remove_file(&artifact.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "[local] failed to remove chunk {}: {}",
                    artifact.path.display(),
                    e
                );
            }
        }
    }
}
