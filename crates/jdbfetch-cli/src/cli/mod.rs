//! CLI for jdbfetch.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use jdbfetch_core::checksum::Checksum;
use jdbfetch_core::config::{self, FetchConfig};
use jdbfetch_core::control::CancelToken;
use std::path::{Path, PathBuf};

use commands::{run_checksum, run_download, run_fetch, run_resolve};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "jdbfetch")]
#[command(about = "Fetch and verify virus definitions files with parallel range requests", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/jdbfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for the download parameters in the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Bytes per ranged request.
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<u64>,
    /// Concurrent ranged requests.
    #[arg(long, value_name = "N")]
    pub pool_size: Option<usize>,
    /// Attempts per chunk, including the first.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
    /// Directory to write the file to.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn apply(&self, cfg: &mut FetchConfig) {
        if let Some(n) = self.chunk_size {
            cfg.chunk_size = n;
        }
        if let Some(n) = self.pool_size {
            cfg.pool_size = n;
        }
        if let Some(n) = self.max_attempts {
            cfg.retry.max_attempts = n;
        }
        if let Some(dir) = &self.output_dir {
            cfg.download_dir = dir.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve the landing page, download the file and verify it.
    Fetch {
        /// Landing page to scan instead of the configured one.
        #[arg(long)]
        page_url: Option<String>,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the resolved download target without downloading.
    Resolve {
        #[arg(long)]
        page_url: Option<String>,
    },

    /// Download a file URL directly and verify it against a known checksum.
    Download {
        /// Direct HTTP/HTTPS URL of the file.
        url: String,
        /// Expected MD5 (32 hex digits) or SHA-256 (64 hex digits).
        #[arg(long)]
        checksum: Checksum,
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the digest of a local file (MD5 unless --sha256).
    Checksum {
        /// Path to the file.
        path: PathBuf,
        #[arg(long)]
        sha256: bool,
    },
}

impl Cli {
    pub async fn run(self, cancel: CancelToken) -> Result<()> {
        match self.command {
            CliCommand::Fetch { page_url, run } => {
                let cfg = load_config(self.config.as_deref())?;
                run_fetch(cfg, page_url, &run, cancel).await
            }
            CliCommand::Resolve { page_url } => {
                let cfg = load_config(self.config.as_deref())?;
                run_resolve(cfg, page_url).await
            }
            CliCommand::Download { url, checksum, run } => {
                let cfg = load_config(self.config.as_deref())?;
                run_download(cfg, url, checksum, &run, cancel).await
            }
            CliCommand::Checksum { path, sha256 } => run_checksum(path, sha256).await,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<FetchConfig> {
    let cfg = match path {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
