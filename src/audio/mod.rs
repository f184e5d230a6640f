//! Audio probing, slicing and transcoding.
//!
//! WAV files are handled in-process with `hound`; everything else goes
//! through the `ffmpeg`/`ffprobe` binaries.

mod ffmpeg;
mod source;
mod wav;

pub use ffmpeg::FfmpegCodec;
pub use source::AudioSource;
pub(crate) use source::file_stem;
pub use wav::WavCodec;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Reads source metadata and writes time ranges of it as standalone files.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    fn id(&self) -> &'static str;

    /// Open `path` and determine its duration and size.
    /// Fails with `SourceUnreadable` when the file is missing, undecodable or empty.
    async fn probe(&self, path: &Path) -> Result<AudioSource>;

    /// Write `[start_secs, end_secs)` of `source` to `output` as an
    /// independently decodable file. Fails with `EncodeFailure`.
    async fn extract(
        &self,
        source: &AudioSource,
        start_secs: f64,
        end_secs: f64,
        output: &Path,
    ) -> Result<()>;

    /// Extension used for chunk artifacts cut from `source`.
    fn chunk_extension(&self, source: &AudioSource) -> String;
}

/// Converts a whole file to the codec the staged backend expects.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extension of the files this transcoder produces, e.g. `flac`.
    fn target_extension(&self) -> &'static str;

    /// Fails with `ConversionFailure`.
    async fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Pick the codec for a source path: WAV in-process, anything else via ffmpeg.
pub fn codec_for(path: &Path, ffmpeg: &FfmpegCodec) -> Arc<dyn AudioCodec> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"));
    if is_wav {
        Arc::new(WavCodec)
    } else {
        Arc::new(ffmpeg.clone())
    }
}
