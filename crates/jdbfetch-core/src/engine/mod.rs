//! One pipeline run: resolve, plan, download in parallel, verify, finalize.
//!
//! Chunks land in `<name>.part`, which is synced, verified and then renamed
//! to `<name>`. Any failure removes the `.part` file, so a file with the
//! final name only ever exists once its checksum has matched.

mod run;

use std::fmt;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::checksum::{self, ChecksumAlgorithm};
use crate::control::CancelToken;
use crate::error::FetchError;
use crate::http::HttpOptions;
use crate::resolver::TargetResolver;
use crate::retry::RetryPolicy;
use crate::segmenter::{chunk_count, plan_chunks, DEFAULT_CHUNK_SIZE, MAX_CHUNKS};
use crate::storage::{self, StorageWriter, StorageWriterBuilder};
use crate::target::DownloadTarget;

/// Worker count when nothing else is configured.
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Tunables for one run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub chunk_size: NonZeroU64,
    /// Upper bound on concurrent chunk transfers.
    pub pool_size: usize,
    pub retry: RetryPolicy,
    pub http: HttpOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            retry: RetryPolicy::default(),
            http: HttpOptions::default(),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub url: String,
    /// Final, verified file.
    pub path: PathBuf,
    pub bytes: u64,
    pub chunks: usize,
    /// Retries scheduled across all chunks.
    pub retries: u32,
    pub elapsed: Duration,
    pub algorithm: ChecksumAlgorithm,
    /// Verified digest, uppercase hex.
    pub digest: String,
}

impl FetchReport {
    /// Average bytes per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bytes, {} chunks, {} retries) in {:.2}s, {:.1} KiB/s, {} {}",
            self.path.display(),
            self.bytes,
            self.chunks,
            self.retries,
            self.elapsed.as_secs_f64(),
            self.throughput() / 1024.0,
            self.algorithm,
            self.digest
        )
    }
}

/// Resolves `location` with `resolver` and downloads the result into `dest_dir`.
pub fn resolve_and_fetch(
    resolver: &dyn TargetResolver,
    location: &str,
    dest_dir: &Path,
    opts: &EngineOptions,
    cancel: &CancelToken,
) -> Result<FetchReport, FetchError> {
    let target = resolver.resolve(location)?;
    tracing::info!(
        url = target.url(),
        name = target.name(),
        size = target.size(),
        checksum = %target.checksum(),
        "target resolved"
    );
    download_and_verify(&target, dest_dir, opts, cancel)
}

/// Downloads `target` into `dest_dir/<name>` and verifies its checksum.
pub fn download_and_verify(
    target: &DownloadTarget,
    dest_dir: &Path,
    opts: &EngineOptions,
    cancel: &CancelToken,
) -> Result<FetchReport, FetchError> {
    let started = Instant::now();
    let final_path = dest_dir.join(target.name());
    let part_path = storage::temp_path(&final_path);

    let count = chunk_count(target.size(), opts.chunk_size);
    if count > MAX_CHUNKS {
        return Err(FetchError::TooLarge {
            size: target.size(),
            chunk_size: opts.chunk_size.get(),
            chunks: count,
            limit: MAX_CHUNKS,
        });
    }
    tracing::info!(
        url = target.url(),
        path = %final_path.display(),
        size = target.size(),
        chunks = count,
        chunk_size = opts.chunk_size.get(),
        pool_size = opts.pool_size,
        "download started"
    );

    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    // Pre-size before planning: a size the filesystem cannot hold fails here
    // as a storage error.
    let mut builder = StorageWriterBuilder::create(&part_path).map_err(FetchError::Storage)?;
    if let Err(e) = builder.preallocate(target.size()) {
        discard(builder.build());
        return Err(FetchError::Storage(e));
    }
    let writer = builder.build();
    let chunks = plan_chunks(target.size(), opts.chunk_size);

    let retries = match run::run_chunks(target.url(), &chunks, writer.clone(), opts, cancel) {
        Ok(retries) => retries,
        Err(e) => {
            discard(writer);
            return Err(e);
        }
    };

    if let Err(e) = writer.sync() {
        discard(writer);
        return Err(FetchError::Storage(e));
    }
    // Deletes the .part file itself on mismatch.
    let digest = match checksum::verify_file(writer.temp_path(), target.checksum()) {
        Ok(digest) => digest,
        Err(e) => {
            discard(writer);
            return Err(FetchError::Integrity(e));
        }
    };
    writer.finalize(&final_path).map_err(FetchError::Storage)?;

    let report = FetchReport {
        url: target.url().to_string(),
        path: final_path,
        bytes: target.size(),
        chunks: chunks.len(),
        retries,
        elapsed: started.elapsed(),
        algorithm: target.checksum().algorithm(),
        digest,
    };
    tracing::info!(
        path = %report.path.display(),
        bytes = report.bytes,
        retries = report.retries,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "download finished"
    );
    Ok(report)
}

fn discard(writer: StorageWriter) {
    let path = writer.temp_path().to_path_buf();
    if let Err(e) = writer.discard() {
        tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "could not remove partial file");
    }
}
