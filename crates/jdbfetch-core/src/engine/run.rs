//! Dispatch loop for one run: pool, per-chunk outcomes, retries.

use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::downloader::ChunkDownloader;
use crate::error::FetchError;
use crate::pool::WorkerPool;
use crate::retry::{RetryCoordinator, RetryVerdict, WorkItem};
use crate::segmenter::{ChunkBitmap, ChunkRange};
use crate::storage::StorageWriter;

use super::EngineOptions;

/// Upper bound on how long the loop blocks before re-checking cancellation
/// and due retries.
const POLL: Duration = Duration::from_millis(100);

/// Downloads every chunk of `chunks` into `storage`. Returns the number of
/// retries used. On error, in-flight transfers have been aborted and every
/// worker has exited before this returns.
pub(super) fn run_chunks(
    url: &str,
    chunks: &[ChunkRange],
    storage: StorageWriter,
    opts: &EngineOptions,
    cancel: &CancelToken,
) -> Result<u32, FetchError> {
    if chunks.is_empty() {
        return Ok(0);
    }

    // Cancelled on fatal error so the other workers stop early; the caller's
    // token is left alone.
    let run_cancel = cancel.child();
    let downloader = Arc::new(ChunkDownloader::new(
        url,
        opts.http.clone(),
        storage,
        run_cancel.clone(),
    ));
    let workers = opts.pool_size.min(chunks.len()).max(1);
    let d = Arc::clone(&downloader);
    let pool = WorkerPool::start(workers, "chunk", move |item: WorkItem| {
        d.fetch(item).map(|bytes| (item.chunk, bytes))
    })
    .map_err(FetchError::Pool)?;
    tracing::debug!(workers = pool.size(), chunks = chunks.len(), "worker pool started");

    let mut coordinator = RetryCoordinator::new(opts.retry);
    let mut bitmap = ChunkBitmap::new(chunks.len());
    for chunk in chunks {
        pool.submit(WorkItem::first(*chunk));
    }

    let mut failure: Option<FetchError> = None;
    while !bitmap.all_completed() {
        if cancel.is_cancelled() {
            failure = Some(FetchError::Cancelled);
            break;
        }

        let now = Instant::now();
        for item in coordinator.take_ready(now) {
            tracing::debug!(chunk = item.chunk.index(), attempt = item.attempt, "resubmitting chunk");
            pool.submit(item);
        }
        let wait = coordinator
            .next_ready_at()
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(POLL)
            .min(POLL);

        match pool.recv_timeout(wait) {
            Ok(Ok(Ok((chunk, bytes)))) => {
                bitmap.set_completed(chunk.index());
                tracing::debug!(
                    chunk = chunk.index(),
                    bytes,
                    completed = bitmap.completed_count(),
                    total = bitmap.chunk_count(),
                    "chunk succeeded"
                );
            }
            Ok(Ok(Err(err))) => {
                if err.is_cancelled() {
                    failure = Some(FetchError::Cancelled);
                    break;
                }
                if let RetryVerdict::Exhausted(err) = coordinator.on_failure(err, Instant::now()) {
                    failure = Some(FetchError::ChunkTransfer(err));
                    break;
                }
            }
            Ok(Err(panic)) => {
                tracing::error!(error = %panic, "chunk worker panicked");
                failure = Some(FetchError::WorkerPanicked(panic.to_string()));
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                failure = Some(FetchError::WorkerPanicked(
                    "all chunk workers exited".to_string(),
                ));
                break;
            }
        }
    }

    if let Some(err) = failure {
        run_cancel.cancel();
        let dropped = pool.clear();
        let unread = pool.join();
        tracing::debug!(
            dropped,
            unread = unread.len(),
            retries_waiting = coordinator.waiting(),
            missing = ?bitmap.missing(),
            "run aborted"
        );
        return Err(err);
    }

    pool.join();
    Ok(coordinator.retries())
}
