//! CLI command handlers, one file per command.

mod checksum;
mod download;
mod fetch;
mod resolve;

pub use checksum::run_checksum;
pub use download::run_download;
pub use fetch::run_fetch;
pub use resolve::run_resolve;

use anyhow::{Context, Result};
use jdbfetch_core::config::FetchConfig;
use jdbfetch_core::engine::{EngineOptions, FetchReport};
use jdbfetch_core::error::FetchError;
use std::path::PathBuf;

use super::RunArgs;

/// Applies flag overrides and validates the result.
fn prepare(mut cfg: FetchConfig, run: &RunArgs) -> Result<(FetchConfig, EngineOptions, PathBuf)> {
    run.apply(&mut cfg);
    let opts = cfg.engine_options()?;
    let dest = cfg.download_dir.clone();
    std::fs::create_dir_all(&dest)
        .with_context(|| format!("cannot create output directory {}", dest.display()))?;
    Ok((cfg, opts, dest))
}

/// Runs the blocking pipeline off the async runtime so the Ctrl-C handler keeps running.
async fn run_blocking<F>(job: F) -> Result<FetchReport>
where
    F: FnOnce() -> Result<FetchReport, FetchError> + Send + 'static,
{
    let report = tokio::task::spawn_blocking(job)
        .await
        .context("download task failed")??;
    Ok(report)
}

fn print_report(report: &FetchReport) {
    println!("{}", report);
}
