//! Convert a source to the backend codec and upload it to object storage.

use super::store::{ObjectStore, RemoteRef};
use crate::audio::{file_stem, Transcoder};
use crate::error::{Result, TranscribeError};
use crate::paths::object_key;
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

pub const DEFAULT_BUCKET: &str = "demo-speechless";
pub const DEFAULT_BLOB_PATH: &str = "demo/audio-files/";

#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub bucket: String,
    /// Prepended verbatim to the object name.
    pub blob_path: String,
    /// Where the converted file is written before upload.
    pub work_dir: PathBuf,
    /// Key objects by content hash and skip the upload when one already exists.
    pub dedup: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            blob_path: DEFAULT_BLOB_PATH.to_string(),
            work_dir: PathBuf::from("."),
            dedup: false,
        }
    }
}

pub struct Stager {
    transcoder: Arc<dyn Transcoder>,
    store: Arc<dyn ObjectStore>,
    config: StagingConfig,
}

impl Stager {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        store: Arc<dyn ObjectStore>,
        config: StagingConfig,
    ) -> Self {
        Self {
            transcoder,
            store,
            config,
        }
    }

    /// Convert `source_path`, upload the result and return where it landed.
    /// Uploads every time unless dedup is enabled. The converted copy is a
    /// temporary file owned by the stager and removed afterwards; files already
    /// in the work dir are never written or deleted. The remote object is kept.
    pub async fn stage(&self, source_path: &Path) -> Result<RemoteRef> {
        let stem = file_stem(source_path);
        let ext = self.transcoder.target_extension();
        let converted = self.scratch_file(&stem, ext)?;

        self.transcoder.convert(source_path, &converted).await?;
        info!(
            "[stager] converted {} -> {}",
            source_path.display(),
            converted.display()
        );

        let result = self.upload_converted(&converted, &stem, ext).await;
        let scratch = converted.to_path_buf();
        if let Err(e) = converted.close() {
            warn!("[stager] failed to remove {}: {}", scratch.display(), e);
        }
        result
    }

    /// Fresh, uniquely named file in the work dir, deleted when dropped.
    fn scratch_file(&self, stem: &str, ext: &str) -> Result<TempPath> {
        let dir = &self.config.work_dir;
        std::fs::create_dir_all(dir).map_err(|e| {
            TranscribeError::ConversionFailure(format!("cannot create {}: {}", dir.display(), e))
        })?;
        tempfile::Builder::new()
            .prefix(&format!(".{}-", stem))
            .suffix(&format!(".{}", ext))
            .tempfile_in(dir)
            .map(|f| f.into_temp_path())
            .map_err(|e| {
                TranscribeError::ConversionFailure(format!(
                    "cannot create scratch file in {}: {}",
                    dir.display(),
                    e
                ))
            })
    }

    async fn upload_converted(&self, converted: &Path, stem: &str, ext: &str) -> Result<RemoteRef> {
        let bucket = &self.config.bucket;
        if self.config.dedup {
            let digest = content_digest(converted).await?;
            let key = object_key(
                &self.config.blob_path,
                &format!("{}-{}.{}", stem, &digest[..16], ext),
            );
            if self.store.exists(bucket, &key).await? {
                info!("[stager] gs://{}/{} already present, skipping upload", bucket, key);
                return Ok(RemoteRef::new(bucket.clone(), key));
            }
            self.store.upload(bucket, converted, &key).await?;
            info!("[stager] uploaded {} to gs://{}/{}", converted.display(), bucket, key);
            return Ok(RemoteRef::new(bucket.clone(), key));
        }

        let key = object_key(&self.config.blob_path, &format!("{}.{}", stem, ext));
        self.store.upload(bucket, converted, &key).await?;
        info!("[stager] uploaded {} to gs://{}/{}", converted.display(), bucket, key);
        Ok(RemoteRef::new(bucket.clone(), key))
    }
}

/// Hex SHA-256 of a file's contents.
async fn content_digest(path: &Path) -> Result<String> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut file = std::fs::File::open(&owned)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok(format!("{:x}", hasher.finalize()))
    })
    .await
    .map_err(|e| TranscribeError::UploadFailure(e.to_string()))?
    .map_err(|e| TranscribeError::UploadFailure(format!("hashing {}: {}", path.display(), e)))
}
