//! Rendition CLI - resize, crop and store EXIF-corrected image renditions.
//!
//! Each input image is turned into one JPEG per configured size, plus an info
//! mapping with dimensions, format, color mode and EXIF fields. Results are
//! stored under a key derived from the checksum of the original bytes.
//!
//! # Usage
//!
//! ```bash
//! # Process a file with the configured sizes
//! rendition process photo.jpg
//!
//! # Read from stdin and emit one size as raw JPEG
//! cat photo.jpg | rendition process --response 300x300 > small.jpg
//!
//! # Fetch a stored blob
//! rendition get 4fR2kq9_300x300.jpg --output small.jpg
//!
//! # View configuration
//! rendition config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Rendition - resize, crop and store EXIF-corrected image renditions.
#[derive(Parser, Debug)]
#[command(name = "rendition")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Produce renditions for one or more images
    Process(cli::process::ProcessArgs),

    /// Read a stored blob by key
    Get(cli::get::GetArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config warnings go straight to stderr.
    let config = match rendition_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `rendition config check`."
            );
            rendition_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Rendition v{}", rendition_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args).await,
        Commands::Get(args) => cli::get::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
