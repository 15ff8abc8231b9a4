//! Resolve command: print what `fetch` would download.

use anyhow::{Context, Result};
use jdbfetch_core::config::FetchConfig;
use jdbfetch_core::error::FetchError;
use jdbfetch_core::resolver::{PageResolver, TargetResolver};

pub async fn run_resolve(cfg: FetchConfig, page_url: Option<String>) -> Result<()> {
    let page_url = page_url.unwrap_or_else(|| cfg.page_url.clone());
    let resolver = PageResolver::new(cfg.page_patterns()?, cfg.http.options());

    let target = tokio::task::spawn_blocking(move || resolver.resolve(&page_url))
        .await
        .context("resolve task failed")?
        .map_err(FetchError::from)?;

    println!("url:      {}", target.url());
    println!("name:     {}", target.name());
    println!("size:     {}", target.size());
    println!("checksum: {}", target.checksum());
    Ok(())
}
