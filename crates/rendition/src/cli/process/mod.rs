//! The `rendition process` command for producing image renditions.

mod batch;
mod setup;
pub mod types;

pub use types::Response;

use clap::Args;
use rendition_core::{BlobStore, Config, Processed, Processor, WorkerPool};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch::process_batch;
use setup::setup_processor;

/// Arguments for the `process` command.
#[derive(Args, Debug, Default)]
pub struct ProcessArgs {
    /// Image files to process; reads stdin when empty or `-`
    pub files: Vec<PathBuf>,

    /// Comma-separated size descriptors, e.g. 50x50c,300x300
    #[arg(short, long, value_delimiter = ',')]
    pub sizes: Option<Vec<String>>,

    /// JPEG output quality (0-100)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Blob time-to-live in seconds
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Skip persistence entirely
    #[arg(long)]
    pub no_save: bool,

    /// Skip uploading to the blob store
    #[arg(long)]
    pub no_save_blob: bool,

    /// Number of transform workers (0 runs inline)
    #[arg(short, long)]
    pub pool_size: Option<usize>,

    /// Filename recorded in the image info (defaults to the input file name)
    #[arg(long)]
    pub filename: Option<String>,

    /// What to emit: none, checksum, info, or a configured size name
    #[arg(short, long)]
    pub response: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ProcessArgs {
    /// Input paths as given, with stdin standing in for an empty list.
    pub fn inputs(&self) -> Vec<String> {
        if self.files.is_empty() {
            vec!["-".to_string()]
        } else {
            self.files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect()
        }
    }
}

/// Processing context assembled by setup_processor().
pub(crate) struct ProcessContext {
    pub config: Config,
    pub pool: WorkerPool,
    pub store: Option<Arc<dyn BlobStore>>,
    pub response: Response,
}

impl ProcessContext {
    /// A processor for one input, sharing the pool and store.
    fn processor_for(&self, filename: Option<String>) -> Processor {
        let mut config = self.config.processor.clone();
        if config.filename.is_none() {
            config.filename = filename;
        }
        let mut processor = Processor::new(config).with_pool(self.pool.clone());
        if let Some(store) = &self.store {
            processor = processor.with_store(store.clone());
        }
        processor
    }

    /// Process one input path, or stdin for `-`.
    async fn process_input(&self, input: &str) -> anyhow::Result<Processed> {
        if input == "-" {
            let processor = self.processor_for(None);
            return Ok(processor.process_stream(tokio::io::stdin()).await?);
        }
        let path = Path::new(input);
        let raw = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(self.processor_for(filename).process(raw).await?)
    }
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs) -> anyhow::Result<()> {
    let ctx = setup_processor(&args).await?;
    let inputs = args.inputs();

    if inputs.len() == 1 {
        process_single(ctx, &args, &inputs[0]).await
    } else {
        if args.output.is_some() {
            anyhow::bail!("--output needs a single input");
        }
        process_batch(ctx, inputs).await
    }
}

// ── Single-file processing ─────────────────────────────────────────────────

async fn process_single(ctx: ProcessContext, args: &ProcessArgs, input: &str) -> anyhow::Result<()> {
    let processed = ctx.process_input(input).await?;
    tracing::debug!("Processed {} in {:?}", input, processed.stats.total);

    if let Some(ref output_path) = args.output {
        let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
        ctx.response.write(&processed, &mut file)?;
        file.flush()?;
        tracing::info!("Output written to {:?}", output_path);
    } else {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        ctx.response.write(&processed, &mut lock)?;
        lock.flush()?;
    }
    Ok(())
}
