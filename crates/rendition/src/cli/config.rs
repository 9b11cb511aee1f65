//! The `rendition config` command for configuration management.

use clap::{Args, Subcommand};
use rendition_core::{Config, SizeSpec};
use std::path::PathBuf;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Parse and validate a config file without processing anything
    Check {
        /// File to check (defaults to the config file path)
        file: Option<PathBuf>,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", Config::default_path().display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default().to_toml()?)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Check { file } => {
            let path = file.unwrap_or_else(Config::default_path);
            let config = Config::load_from(&path)?;
            SizeSpec::parse_all(&config.processor.sizes)?;
            println!(
                "{} is valid ({} size(s), store at {})",
                path.display(),
                config.processor.sizes.len(),
                config.store_dir().display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processor]\nsizes = [\"120x80c\"]\n").unwrap();
        let args = ConfigArgs {
            command: ConfigCommand::Check { file: Some(path) },
        };
        execute(args).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_bad_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processor]\nsizes = [\"x80\"]\n").unwrap();
        let args = ConfigArgs {
            command: ConfigCommand::Check { file: Some(path) },
        };
        assert!(execute(args).await.is_err());
    }
}
