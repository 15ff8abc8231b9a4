//! Download command: skip the landing page and fetch a known URL.

use anyhow::Result;
use jdbfetch_core::checksum::Checksum;
use jdbfetch_core::config::FetchConfig;
use jdbfetch_core::control::CancelToken;
use jdbfetch_core::engine;
use jdbfetch_core::resolver::DirectResolver;

use super::{prepare, print_report, run_blocking};
use crate::cli::RunArgs;

pub async fn run_download(
    cfg: FetchConfig,
    url: String,
    checksum: Checksum,
    run: &RunArgs,
    cancel: CancelToken,
) -> Result<()> {
    let (_, opts, dest) = prepare(cfg, run)?;
    let resolver = DirectResolver::new(checksum, opts.http.clone());

    let report = run_blocking(move || {
        engine::resolve_and_fetch(&resolver, &url, &dest, &opts, &cancel)
    })
    .await?;
    print_report(&report);
    Ok(())
}
