//! Path utilities for chunk artifacts, object keys and logs.

use std::path::{Path, PathBuf};

/// Chunk artifact name: `<stem>_chunk_<start seconds>.<ext>`.
/// Named by start offset, so two runs over same-named sources in one
/// directory write to the same files.
pub fn chunk_artifact_path(dir: &Path, stem: &str, start_secs: f64, ext: &str) -> PathBuf {
    dir.join(format!("{}_chunk_{}.{}", stem, start_secs, ext))
}

/// Object key under `prefix`. The prefix is used verbatim, so it normally
/// ends with `/`.
pub fn object_key(prefix: &str, file_name: &str) -> String {
    format!("{}{}", prefix, file_name)
}

/// Log directory under the platform data dir (e.g. ~/.local/share/speechless/logs).
pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("speechless").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".").join("logs"))
}

/// Get the log file path, creating its directory if necessary.
pub fn log_file_path() -> std::io::Result<PathBuf> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("speechless.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_artifact_path_uses_start_offset() {
        let p = chunk_artifact_path(Path::new("/tmp"), "talk", 0.0, "mp3");
        assert_eq!(p, PathBuf::from("/tmp/talk_chunk_0.mp3"));
        let p = chunk_artifact_path(Path::new("/tmp"), "talk", 33.5, "wav");
        assert_eq!(p, PathBuf::from("/tmp/talk_chunk_33.5.wav"));
    }

    #[test]
    fn test_object_key_joins_prefix_verbatim() {
        assert_eq!(
            object_key("demo/audio-files/", "talk.flac"),
            "demo/audio-files/talk.flac"
        );
        assert_eq!(object_key("", "talk.flac"), "talk.flac");
    }
}
