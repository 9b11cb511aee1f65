//! Local filesystem blob store.
//!
//! Each key is a file directly under the root. Its expiry (unix seconds) is
//! kept in a sidecar file under `.expiry/`, which no valid key can name.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{validate_key, BlobStore};
use crate::error::{StoreError, StoreResult};

const EXPIRY_DIR: &str = ".expiry";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blob store rooted at a local directory.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(EXPIRY_DIR)).await?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn expiry_path(&self, key: &str) -> PathBuf {
        self.root.join(EXPIRY_DIR).join(key)
    }

    /// Write to a unique temp file, fsync, then rename over `path`.
    async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
        let temp_name = format!(
            ".tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    async fn read_expiry(&self, key: &str) -> StoreResult<Option<u64>> {
        match fs::read_to_string(self.expiry_path(key)).await {
            Ok(content) => Ok(content.trim().parse().ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        validate_key(key)?;
        let expires_at = unix_now().saturating_add(ttl.as_secs());
        Self::write_atomic(&self.blob_path(key), &data).await?;
        Self::write_atomic(&self.expiry_path(key), expires_at.to_string().as_bytes()).await?;
        tracing::trace!(key, size = data.len(), expires_at, "stored blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        validate_key(key)?;
        if let Some(expires_at) = self.read_expiry(key).await? {
            if unix_now() >= expires_at {
                return Err(StoreError::NotFound(key.to_string()));
            }
        }
        fs::read(self.blob_path(key)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io(e)
            }
        })
    }
}
