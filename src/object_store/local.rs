//! Local-disk object store: the coordinator itself serves PUT/GET under
//! `/api/file/{upload,download}/<key>`, with a sidecar metadata file per
//! object and a periodic housekeeper purging anything past its TTL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use slog::{info, warn, Logger};
use tokio::fs;

use super::{ObjectStore, ObjectStoreError, UploadSlot};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    created_at: i64,
}

pub struct LocalObjectStore {
    root: PathBuf,
    bind_addr_display: String,
    object_ttl_s: u64,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, bind_addr_display: impl Into<String>, object_ttl_s: u64) -> Self {
        Self { root: root.into(), bind_addr_display: bind_addr_display.into(), object_ttl_s }
    }

    fn object_path(&self, file_key: &str) -> PathBuf {
        self.root.join(file_key)
    }

    fn sidecar_path(&self, file_key: &str) -> PathBuf {
        self.root.join(format!("{file_key}.meta.json"))
    }

    pub async fn ensure_root(&self) -> Result<(), ObjectStoreError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Runs forever, purging objects older than `object_ttl_s` every
    /// `cleanup_interval_s`. Meant to be spawned as an independent task,
    /// not driven by the Registry actor.
    pub async fn run_housekeeper(&self, cleanup_interval_s: u64, log: Logger) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_s));
        loop {
            interval.tick().await;
            if let Err(e) = self.sweep(&log).await {
                warn!(log, "housekeeper sweep failed"; "error" => %e);
            }
        }
    }

    async fn sweep(&self, log: &Logger) -> Result<(), ObjectStoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let now = Utc::now().timestamp();
        let mut purged = 0u32;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(raw) = fs::read(&path).await else { continue };
            let Ok(meta): Result<Sidecar, _> = serde_json::from_slice(&raw) else { continue };
            if now - meta.created_at <= self.object_ttl_s as i64 {
                continue;
            }
            let _ = fs::remove_file(&path).await;
            if let Some(object) = strip_sidecar_suffix(&path) {
                let _ = fs::remove_file(&object).await;
            }
            purged += 1;
        }
        if purged > 0 {
            info!(log, "housekeeper purged expired objects"; "count" => purged);
        }
        Ok(())
    }
}

fn strip_sidecar_suffix(sidecar: &Path) -> Option<PathBuf> {
    let name = sidecar.file_name()?.to_str()?;
    let object_name = name.strip_suffix(".meta.json")?;
    Some(sidecar.with_file_name(object_name))
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn issue_upload_slot(&self, filename: &str, content_type: &str) -> Result<UploadSlot, ObjectStoreError> {
        let file_key = mint_file_key(filename);
        let sidecar = Sidecar { content_type: content_type.to_owned(), created_at: Utc::now().timestamp() };
        let sidecar_bytes =
            serde_json::to_vec(&sidecar).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        fs::write(self.sidecar_path(&file_key), sidecar_bytes).await?;

        Ok(UploadSlot {
            upload_url: format!("http://{}/api/file/upload/{file_key}", self.bind_addr_display),
            download_url: format!("http://{}/api/file/download/{file_key}", self.bind_addr_display),
            file_key,
            expires_in_s: self.object_ttl_s,
        })
    }

    async fn read(&self, file_key: &str) -> Result<(Vec<u8>, String), ObjectStoreError> {
        let bytes = fs::read(self.object_path(file_key))
            .await
            .map_err(|_| ObjectStoreError::NotFound(file_key.to_owned()))?;
        let sidecar_raw = fs::read(self.sidecar_path(file_key)).await?;
        let sidecar: Sidecar = serde_json::from_slice(&sidecar_raw)
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        Ok((bytes, sidecar.content_type))
    }

    async fn write(&self, file_key: &str, bytes: &[u8], content_type: &str) -> Result<(), ObjectStoreError> {
        fs::write(self.object_path(file_key), bytes).await?;
        let sidecar = Sidecar { content_type: content_type.to_owned(), created_at: Utc::now().timestamp() };
        let sidecar_bytes =
            serde_json::to_vec(&sidecar).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        fs::write(self.sidecar_path(file_key), sidecar_bytes).await?;
        Ok(())
    }
}

fn mint_file_key(filename: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: u64 = rng.gen();
    let safe_name: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{suffix:016x}-{safe_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "localhost:8080", 3600);
        store.ensure_root().await.unwrap();

        let slot = store.issue_upload_slot("photo.png", "image/png").await.unwrap();
        store.write(&slot.file_key, b"hello", "image/png").await.unwrap();
        let (bytes, content_type) = store.read(&slot.file_key).await.unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn mints_filesystem_safe_keys() {
        let key = mint_file_key("../../etc/passwd");
        assert!(!key.contains('/'));
    }
}
