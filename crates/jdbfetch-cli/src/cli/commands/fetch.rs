//! Fetch command: resolve the landing page, then download and verify.

use anyhow::Result;
use jdbfetch_core::config::FetchConfig;
use jdbfetch_core::control::CancelToken;
use jdbfetch_core::engine;
use jdbfetch_core::resolver::PageResolver;

use super::{prepare, print_report, run_blocking};
use crate::cli::RunArgs;

pub async fn run_fetch(
    cfg: FetchConfig,
    page_url: Option<String>,
    run: &RunArgs,
    cancel: CancelToken,
) -> Result<()> {
    let (cfg, opts, dest) = prepare(cfg, run)?;
    let page_url = page_url.unwrap_or_else(|| cfg.page_url.clone());
    let resolver = PageResolver::new(cfg.page_patterns()?, opts.http.clone());

    let report = run_blocking(move || {
        engine::resolve_and_fetch(&resolver, &page_url, &dest, &opts, &cancel)
    })
    .await?;
    print_report(&report);
    Ok(())
}
