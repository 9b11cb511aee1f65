//! The `rendition get` command for reading stored blobs back.

use clap::Args;
use rendition_core::{BlobStore, Config, FilesystemBlobStore};
use std::io::Write;
use std::path::PathBuf;

/// Arguments for the `get` command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Blob key, e.g. `4fR2kq9_300x300.jpg` or `4fR2kq9.json`
    pub key: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the get command.
pub async fn execute(args: GetArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let store = FilesystemBlobStore::new(config.store_dir()).await?;
    fetch(&store, &args).await
}

async fn fetch(store: &dyn BlobStore, args: &GetArgs) -> anyhow::Result<()> {
    let data = store.get(&args.key).await?;
    tracing::debug!("Read {} ({} bytes)", args.key, data.len());

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &data).await?;
            tracing::info!("Output written to {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(&data)?;
            lock.flush()?;
        }
    }
    Ok(())
}
