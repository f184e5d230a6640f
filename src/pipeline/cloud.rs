//! Cloud-staged orchestrator: stage one file, run a single long-running
//! recognition over it, render the cues.

use super::PipelineState;
use crate::error::Result;
use crate::export::{self, DisplayFormatter, OutputFormat, Passthrough};
use crate::staging::Stager;
use crate::transcription::{RecognitionConfig, TranscriptionBackend, TranscriptionRequest};
use log::info;
use std::path::Path;
use std::sync::Arc;

pub struct CloudPipeline {
    stager: Stager,
    backend: Arc<dyn TranscriptionBackend>,
    recognition: RecognitionConfig,
    format: OutputFormat,
    formatter: Arc<dyn DisplayFormatter>,
}

impl CloudPipeline {
    pub fn new(stager: Stager, backend: Arc<dyn TranscriptionBackend>) -> Self {
        Self {
            stager,
            backend,
            recognition: RecognitionConfig::default(),
            format: OutputFormat::Text,
            formatter: Arc::new(Passthrough),
        }
    }

    pub fn with_recognition_config(mut self, config: RecognitionConfig) -> Self {
        self.recognition = config;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn DisplayFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    fn enter(&self, state: PipelineState) {
        info!("[cloud] {}", state);
    }

    pub async fn run(&self, source_path: &Path) -> Result<String> {
        let outcome = self.run_stages(source_path).await;
        match outcome {
            Ok(rendered) => {
                self.enter(PipelineState::Done);
                Ok(rendered)
            }
            Err(e) => {
                self.enter(PipelineState::Failed(e.stage()));
                Err(e)
            }
        }
    }

    async fn run_stages(&self, source_path: &Path) -> Result<String> {
        self.enter(PipelineState::Staging);
        let remote = self.stager.stage(source_path).await?;
        info!("[cloud] staged {} as {}", source_path.display(), remote);

        self.enter(PipelineState::Transcribing { chunk: 0, of: 1 });
        let request = TranscriptionRequest::staged(remote.uri(), self.recognition.clone());
        let result = self.backend.submit(request).await?;

        self.enter(PipelineState::Rendering);
        let cues = result.cues();
        info!("[cloud] {} cue(s) from {}", cues.len(), self.backend.name());
        Ok(export::render(&cues, self.format, self.formatter.as_ref()))
    }
}
