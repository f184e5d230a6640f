//! Error taxonomy for a transcription run.

use std::fmt;
use std::path::PathBuf;

/// Pipeline stage an error is attributed to when reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Planning,
    Staging,
    Transcribing,
    Rendering,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Planning => "planning",
            Stage::Staging => "staging",
            Stage::Transcribing => "transcribing",
            Stage::Rendering => "rendering",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// Input missing, undecodable, empty, or of unknown duration.
    #[error("source unreadable ({path}): {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Writing a chunk artifact failed.
    #[error("failed to write chunk {path}: {reason}")]
    EncodeFailure { path: PathBuf, reason: String },

    #[error("codec conversion failed: {0}")]
    ConversionFailure(String),

    #[error("upload failed: {0}")]
    UploadFailure(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The remote service rejected or failed the call. `status` is the HTTP
    /// status or the operation error code reported by the service.
    #[error("backend error {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl TranscribeError {
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TranscribeError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TranscribeError::EncodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            TranscribeError::SourceUnreadable { .. } | TranscribeError::EncodeFailure { .. } => {
                Stage::Planning
            }
            TranscribeError::ConversionFailure(_) | TranscribeError::UploadFailure(_) => {
                Stage::Staging
            }
            TranscribeError::InvalidRequest(_) | TranscribeError::BackendError { .. } => {
                Stage::Transcribing
            }
            TranscribeError::Config(_) => Stage::Setup,
            TranscribeError::Output(_) => Stage::Rendering,
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscribeError>;
