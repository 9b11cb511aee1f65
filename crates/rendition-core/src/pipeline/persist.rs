//! Content-addressed upload of a finished job.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::hash::Checksum;
use super::pool::WorkerPool;
use crate::error::{RenditionError, StoreResult};
use crate::store::BlobStore;
use crate::types::ImageInfo;

/// Concurrent uploads per job, independent of the transform pool size.
pub const UPLOAD_CONCURRENCY: usize = 4;

/// Key of the info JSON for a base key.
pub fn info_key(base: &str) -> String {
    format!("{base}.json")
}

/// Key of one rendition for a base key.
pub fn rendition_key(base: &str, size: &str) -> String {
    format!("{base}_{size}.jpg")
}

/// Upload the info JSON and every rendition under keys derived from the
/// checksum, then record those keys in `info`.
///
/// The stored JSON is `info` as it was before the keys were added. Every
/// upload is awaited; the first failure is returned as is.
pub async fn save_blobs(
    store: Arc<dyn BlobStore>,
    checksum: &Checksum,
    info: &mut ImageInfo,
    results: &BTreeMap<String, Vec<u8>>,
    ttl: Duration,
) -> Result<String, RenditionError> {
    let base = checksum.storage_key();
    let pool = WorkerPool::new(UPLOAD_CONCURRENCY);
    let mut batch = pool.batch::<StoreResult<()>>();

    let json = info.to_json()?;
    let key = info_key(&base);
    {
        let store = store.clone();
        let key = key.clone();
        batch
            .start_async(async move { store.put(&key, json, ttl).await })
            .await;
    }
    info.blob_info_name = Some(key);

    for (size, bytes) in results {
        let key = rendition_key(&base, size);
        let store = store.clone();
        let data = bytes.clone();
        {
            let key = key.clone();
            batch
                .start_async(async move { store.put(&key, data, ttl).await })
                .await;
        }
        info.blob_names.insert(size.clone(), key);
    }

    for result in batch.wait_all().await? {
        result?;
    }
    tracing::info!("save_blob_name: {base}");
    Ok(base)
}
