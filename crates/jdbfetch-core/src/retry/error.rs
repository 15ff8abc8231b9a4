//! Chunk transfer error types.

use std::io;
use thiserror::Error;

use crate::segmenter::ChunkRange;

/// Why a single attempt at a chunk failed.
#[derive(Debug, Error)]
pub enum TransferFailure {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// A 2xx other than 206 for a range that does not start at offset 0: the
    /// body would not line up with the chunk's offset, so nothing was written.
    #[error("server ignored the range request (HTTP {0})")]
    RangeIgnored(u32),
    /// A 206 whose `Content-Range` starts somewhere other than the chunk's
    /// first byte. Aborted before any of its body was written.
    #[error("server sent range starting at {got}, expected {expected}")]
    RangeMismatch { expected: u64, got: u64 },
    /// Transfer completed but fewer bytes arrived than the chunk length
    /// (e.g. server closed early).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// The body was longer than the chunk; bytes past the chunk end were dropped.
    #[error("response body overruns the {expected}-byte chunk")]
    Overflow { expected: u64 },
    /// Positioned write into the output file failed.
    #[error("storage: {0}")]
    Storage(io::Error),
    /// The run's cancellation token fired mid-transfer.
    #[error("cancelled")]
    Cancelled,
}

/// A failed attempt at one chunk, carrying the original range so the same
/// range can be resubmitted.
#[derive(Debug, Error)]
#[error("{chunk} failed on attempt {attempt}: {failure}")]
pub struct ChunkTransferError {
    pub chunk: ChunkRange,
    /// 1-based attempt number that produced this failure.
    pub attempt: u32,
    pub failure: TransferFailure,
}

impl ChunkTransferError {
    pub fn new(chunk: ChunkRange, attempt: u32, failure: TransferFailure) -> Self {
        Self {
            chunk,
            attempt,
            failure,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.failure, TransferFailure::Cancelled)
    }
}
