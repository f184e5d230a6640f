//! Chunked and cloud-staged speech-to-text.
//!
//! The local path splits a recording into chunks under a byte ceiling,
//! transcribes each through an OpenAI-compatible API and joins the results in
//! order. The cloud path converts the recording to FLAC, stages it in object
//! storage and runs one long-running recognition over it.

pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod segmenter;
pub mod staging;
pub mod transcription;

#[cfg(test)]
mod test_support;

pub use config::{CloudRunConfig, LocalRunConfig};
pub use error::{Result, Stage, TranscribeError};
pub use pipeline::{CloudPipeline, LocalPipeline};
