//! Run-level error for one fetch.

use std::io;
use thiserror::Error;

use crate::checksum::IntegrityError;
use crate::resolver::ResolutionError;
use crate::retry::ChunkTransferError;

/// Why a run did not produce a verified file. In every case the `.part` file
/// has been removed and any previously completed file is untouched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),
    /// A chunk used up its attempts or failed with a non-retryable error.
    #[error("download failed: {0}")]
    ChunkTransfer(#[from] ChunkTransferError),
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
    /// The announced size would need more than `MAX_CHUNKS` chunks.
    #[error("{size} bytes in {chunk_size}-byte chunks is {chunks} chunks, over the limit of {limit}")]
    TooLarge {
        size: u64,
        chunk_size: u64,
        chunks: u64,
        limit: u64,
    },
    #[error("storage: {0:#}")]
    Storage(anyhow::Error),
    #[error("worker pool: {0}")]
    Pool(io::Error),
    #[error("{0}")]
    WorkerPanicked(String),
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            FetchError::Resolution(_) => 2,
            FetchError::ChunkTransfer(_) => 3,
            FetchError::Integrity(_) => 4,
            FetchError::Cancelled => 130,
            FetchError::TooLarge { .. }
            | FetchError::Storage(_)
            | FetchError::Pool(_)
            | FetchError::WorkerPanicked(_) => 1,
        }
    }

    /// True for a checksum disagreement (as opposed to failing to read the file).
    pub fn is_integrity_mismatch(&self) -> bool {
        matches!(self, FetchError::Integrity(IntegrityError::Mismatch { .. }))
    }
}
