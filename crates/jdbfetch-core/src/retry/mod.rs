//! Retry and backoff for failed chunks.
//!
//! This module owns the chunk failure types, their classification (timeouts,
//! throttling, connection failures, local I/O) and the exponential backoff
//! policy, plus the coordinator that turns a failed attempt into either a
//! delayed resubmission of the same range or a terminal error.

mod classify;
mod coordinator;
mod error;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use coordinator::{RetryCoordinator, RetryVerdict, WorkItem};
pub use error::{ChunkTransferError, TransferFailure};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
