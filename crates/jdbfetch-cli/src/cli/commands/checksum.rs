//! Checksum command: digest a local file.

use anyhow::{Context, Result};
use jdbfetch_core::checksum::{self, ChecksumAlgorithm};
use std::path::PathBuf;

/// Compute and print the uppercase digest of the given file.
pub async fn run_checksum(path: PathBuf, sha256: bool) -> Result<()> {
    let algorithm = if sha256 {
        ChecksumAlgorithm::Sha256
    } else {
        ChecksumAlgorithm::Md5
    };
    let p = path.clone();
    let digest = tokio::task::spawn_blocking(move || checksum::digest_path(&p, algorithm))
        .await
        .context("checksum task failed")?
        .with_context(|| format!("cannot read {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
