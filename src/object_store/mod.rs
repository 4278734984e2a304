//! Object-store interface for transfer relay fallback.
//!
//! The signaling core only ever sees [`ObjectStore`]; which backend is
//! behind it is a deployment choice (`storage.backend` in [`crate::config`]).

pub mod local;
pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// An upload/download slot issued to a sender ahead of a relay fallback.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadSlot {
    pub upload_url: String,
    pub download_url: String,
    pub file_key: String,
    pub expires_in_s: u64,
}

/// The two operations the signaling core consumes. `read`/`write` only
/// matter for the local backend, which the coordinator itself serves; an
/// S3-compatible backend only ever needs `issue_upload_slot`, since S3
/// handles the actual bytes directly against the presigned URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn issue_upload_slot(&self, filename: &str, content_type: &str) -> Result<UploadSlot, ObjectStoreError>;

    async fn read(&self, file_key: &str) -> Result<(Vec<u8>, String), ObjectStoreError> {
        let _ = file_key;
        Err(ObjectStoreError::Backend("read is only supported by the local backend".into()))
    }

    async fn write(&self, file_key: &str, bytes: &[u8], content_type: &str) -> Result<(), ObjectStoreError> {
        let _ = (file_key, bytes, content_type);
        Err(ObjectStoreError::Backend("write is only supported by the local backend".into()))
    }
}
