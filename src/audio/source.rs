//! Probed description of an input recording.

use std::path::{Path, PathBuf};

/// An input recording as seen by the pipeline. Built once by a codec probe
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub total_bytes: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl AudioSource {
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64, total_bytes: u64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            total_bytes,
            sample_rate: None,
            channels: None,
        }
    }

    /// File name without its extension, e.g. `interview` for `/tmp/interview.mp3`.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    /// Lowercased extension, if the path has one.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Directory holding the source. Falls back to `.` for bare file names.
    pub fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("audio")
        .to_string()
}
