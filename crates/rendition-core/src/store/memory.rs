//! In-process blob store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{validate_key, BlobStore};
use crate::error::{StoreError, StoreResult};

struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Blob store backed by a `HashMap`. Useful for tests and one-shot runs.
/// Expired entries are dropped on the next write, or when read.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that have not expired, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Entries held, expired ones not yet pruned included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        validate_key(key)?;
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        if entries.len() < before {
            tracing::trace!("Pruned {} expired blob(s)", before - entries.len());
        }
        entries.insert(key.to_string(), Entry { data, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(entry.data.clone()),
                None => return Err(StoreError::NotFound(key.to_string())),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write().await;
        // Re-checked under the write lock; a put may have refreshed the key.
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.data.clone()),
            _ => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryBlobStore::new();
        store
            .put("abc.json", b"{}".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("abc.json").await.unwrap(), b"{}");
        assert_eq!(store.keys().await, vec!["abc.json"]);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.get("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_key_reads_as_missing() {
        let store = MemoryBlobStore::new();
        store
            .put("short", b"x".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(
            store.get("short").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.keys().await.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_prunes_expired_entries() {
        let store = MemoryBlobStore::new();
        for key in ["a.json", "b.json", "c.json"] {
            store.put(key, b"x".to_vec(), Duration::ZERO).await.unwrap();
        }
        store
            .put("live.json", b"y".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("live.json").await.unwrap(), b"y");
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBlobStore::new();
        let ttl = Duration::from_secs(60);
        store.put("k", b"one".to_vec(), ttl).await.unwrap();
        store.put("k", b"two".to_vec(), ttl).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let store = MemoryBlobStore::new();
        let err = store
            .put("../x", vec![], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
