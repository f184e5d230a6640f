//! Pluggable transcription backends.

mod backend;
mod long_running;
mod remote_api;

pub use backend::{
    AudioPayload, Cue, RecognitionAudio, RecognitionConfig, ResultBody, TranscriptionBackend,
    TranscriptionRequest, TranscriptionResult,
};
pub use long_running::{GoogleSpeechBackend, LongRunningConfig, DEFAULT_SPEECH_ENDPOINT};
pub use remote_api::{
    list_models, transcribe_via_api, RemoteTranscriptionConfig, WhisperApiBackend,
    DEFAULT_TRANSCRIPTIONS_URL,
};
