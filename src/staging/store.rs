//! Object storage port and the Google Cloud Storage JSON API client.

use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use log::debug;
use std::fmt;
use std::path::Path;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Fully qualified location of a staged object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub bucket: String,
    pub key: String,
}

impl RemoteRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `gs://<bucket>/<key>`
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `local_path` to `bucket` under `key`, replacing any existing object.
    async fn upload(&self, bucket: &str, local_path: &Path, key: &str) -> Result<()>;

    /// Whether an object exists. Only consulted when dedup is enabled.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            access_token: None,
        }
    }
}

pub struct GcsStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl GcsStore {
    pub fn new(config: StorageConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.config.endpoint)
            .map_err(|e| TranscribeError::Config(format!("storage endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| TranscribeError::Config("storage endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.access_token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(&self, bucket: &str, local_path: &Path, key: &str) -> Result<()> {
        let file = tokio::fs::File::open(local_path)
            .await
            .map_err(|e| TranscribeError::UploadFailure(format!("{}: {}", local_path.display(), e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| TranscribeError::UploadFailure(e.to_string()))?
            .len();
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));

        let url = self.url(&["upload", "storage", "v1", "b", bucket, "o"])?;
        debug!("[gcs] uploading {} ({} bytes) to gs://{}/{}", local_path.display(), len, bucket, key);
        let req = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type_for(local_path))
            .header(reqwest::header::CONTENT_LENGTH, len)
            .body(body);

        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| TranscribeError::UploadFailure(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TranscribeError::UploadFailure(format!(
                "storage error {}: {}",
                status, text
            )));
        }
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let url = self.url(&["storage", "v1", "b", bucket, "o", key])?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| TranscribeError::UploadFailure(e.to_string()))?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => Err(TranscribeError::UploadFailure(format!(
                "storage metadata lookup failed with {}",
                s
            ))),
        }
    }
}
