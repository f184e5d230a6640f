//! End-to-end runs: split and transcribe locally, or stage and transcribe in the cloud.

mod cloud;
mod local;

pub use cloud::CloudPipeline;
pub use local::LocalPipeline;

use crate::error::Stage;
use std::fmt;

/// Orchestrator state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Planning,
    Staging,
    Transcribing { chunk: usize, of: usize },
    Joining,
    Rendering,
    CleaningUp,
    Done,
    Failed(Stage),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Planning => write!(f, "planning"),
            PipelineState::Staging => write!(f, "staging"),
            PipelineState::Transcribing { chunk, of } => {
                write!(f, "transcribing {}/{}", chunk + 1, of)
            }
            PipelineState::Joining => write!(f, "joining"),
            PipelineState::Rendering => write!(f, "rendering"),
            PipelineState::CleaningUp => write!(f, "cleaning up"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed(stage) => write!(f, "failed during {}", stage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(
            PipelineState::Transcribing { chunk: 0, of: 3 }.to_string(),
            "transcribing 1/3"
        );
        assert_eq!(
            PipelineState::Failed(Stage::Staging).to_string(),
            "failed during staging"
        );
    }
}
