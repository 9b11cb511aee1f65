//! Processor setup: config overrides, blob store, response selection.

use rendition_core::{BlobStore, Config, FilesystemBlobStore, ProcessorOverlay, WorkerPool};
use std::sync::Arc;

use super::types::Response;
use super::{ProcessArgs, ProcessContext};

/// Turn command-line flags into a request overlay.
pub fn overlay_from_args(args: &ProcessArgs) -> ProcessorOverlay {
    ProcessorOverlay {
        filename: args.filename.clone(),
        quality: args.quality,
        ttl: args.ttl,
        save: args.no_save.then_some(false),
        save_blob: args.no_save_blob.then_some(false),
        sizes: args.sizes.clone(),
        pool_size: args.pool_size,
    }
}

/// Load and merge config, open the blob store if needed, and validate the
/// response selection before any image is read.
pub async fn setup_processor(args: &ProcessArgs) -> anyhow::Result<ProcessContext> {
    for file in args.inputs() {
        if file != "-" && !std::path::Path::new(&file).exists() {
            anyhow::bail!(
                "Input path does not exist: {file}\n\n  Hint: Check the file path and try again."
            );
        }
    }

    let base = Config::load()?;
    let config = base.with_overlay(&overlay_from_args(args))?;
    let response = Response::parse(args.response.as_deref(), &config.processor.sizes)?;

    if response.is_binary() && args.inputs().len() > 1 {
        anyhow::bail!("--response {} needs a single input", args.response.as_deref().unwrap_or(""));
    }

    let store: Option<Arc<dyn BlobStore>> = if config.processor.persists_blobs() {
        let dir = config.store_dir();
        tracing::debug!("Blob store at {:?}", dir);
        Some(Arc::new(FilesystemBlobStore::new(&dir).await?))
    } else {
        None
    };

    let pool = WorkerPool::new(config.processor.pool_size);
    Ok(ProcessContext {
        config,
        pool,
        store,
        response,
    })
}
