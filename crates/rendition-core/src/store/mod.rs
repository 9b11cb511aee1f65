//! Blob store interface and backends.
//!
//! The pipeline only needs `put` with a time-to-live and `get`. Keys are flat
//! names such as `3kTMd92Lx1b.json` or `3kTMd92Lx1b_50x50c.jpg`.

mod filesystem;
mod memory;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// A key/value object store with per-key expiry.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous value.
    async fn put(&self, key: &str, data: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Fetch the value under `key`. Expired keys read as `NotFound`.
    async fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
}

/// Reject keys that are empty, hidden, or could escape a flat namespace.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("abc.json").is_ok());
        assert!(validate_key("abc_50x50c.jpg").is_ok());
        for bad in ["", ".hidden", "../escape", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_key(bad), Err(StoreError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
