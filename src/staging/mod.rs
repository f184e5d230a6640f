//! Staging of large sources in object storage for long-running recognition.

mod stager;
mod store;

pub use stager::{Stager, StagingConfig, DEFAULT_BLOB_PATH, DEFAULT_BUCKET};
pub use store::{GcsStore, ObjectStore, RemoteRef, StorageConfig, DEFAULT_STORAGE_ENDPOINT};
