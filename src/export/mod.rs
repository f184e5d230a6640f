//! Render recognized cues as plain text, SRT or WebVTT.

mod bidi;
mod srt;
mod vtt;

pub use bidi::{BidiFormatter, DisplayFormatter, Passthrough};
pub use srt::render_srt;
pub use vtt::render_vtt;

use crate::transcription::Cue;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One line per cue.
    #[default]
    Text,
    Srt,
    Vtt,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Srt => "srt",
            OutputFormat::Vtt => "vtt",
        })
    }
}

pub fn render_text(cues: &[Cue], formatter: &dyn DisplayFormatter) -> String {
    cues.iter()
        .map(|c| formatter.format_line(&c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render(cues: &[Cue], format: OutputFormat, formatter: &dyn DisplayFormatter) -> String {
    match format {
        OutputFormat::Text => render_text(cues, formatter),
        OutputFormat::Srt => render_srt(cues, formatter),
        OutputFormat::Vtt => render_vtt(cues, formatter),
    }
}

/// Start and end in ms for each cue. Missing offsets fall back to the
/// previous cue's end, so an untimed cue renders as a zero-length span.
pub(crate) fn cue_bounds(cues: &[Cue]) -> Vec<(u64, u64)> {
    let mut previous_end = 0;
    cues.iter()
        .map(|c| {
            let start = c.start_ms.unwrap_or(previous_end);
            let end = c.end_ms.unwrap_or(start).max(start);
            previous_end = end;
            (start, end)
        })
        .collect()
}
