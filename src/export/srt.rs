//! SRT (SubRip) rendering of timed cues.

use super::{cue_bounds, DisplayFormatter};
use crate::transcription::Cue;

fn ms_to_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let mins = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

pub fn render_srt(cues: &[Cue], formatter: &dyn DisplayFormatter) -> String {
    let mut out = String::new();
    for (i, (cue, (start, end))) in cues.iter().zip(cue_bounds(cues)).enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            ms_to_srt_time(start),
            ms_to_srt_time(end)
        ));
        out.push_str(&formatter.format_line(&cue.text));
        out.push_str("\n\n");
    }
    out
}
