//! Single-chunk HTTP Range GET written straight into the output file.
//!
//! One `ChunkDownloader` is shared by every worker of a run. Each call to
//! [`ChunkDownloader::fetch`] opens its own curl handle, asks for exactly the
//! chunk's bytes and writes them at the chunk's offset as they arrive, so
//! nothing is buffered beyond curl's receive buffer.

use std::cell::{Cell, RefCell};

use crate::control::CancelToken;
use crate::http::{parse_content_range_start, parse_status_line, HttpOptions};
use crate::retry::{ChunkTransferError, TransferFailure, WorkItem};
use crate::segmenter::ChunkRange;
use crate::storage::StorageWriter;

pub struct ChunkDownloader {
    url: String,
    http: HttpOptions,
    storage: StorageWriter,
    cancel: CancelToken,
}

impl ChunkDownloader {
    pub fn new(
        url: impl Into<String>,
        http: HttpOptions,
        storage: StorageWriter,
        cancel: CancelToken,
    ) -> Self {
        Self {
            url: url.into(),
            http,
            storage,
            cancel,
        }
    }

    /// Downloads `item.chunk` and returns the number of bytes written, which
    /// always equals the chunk length on success. Any failure, local I/O
    /// included, comes back as a `ChunkTransferError` naming the same range.
    pub fn fetch(&self, item: WorkItem) -> Result<u64, ChunkTransferError> {
        let chunk = item.chunk;
        tracing::debug!(chunk = chunk.index(), attempt = item.attempt, range = %chunk.range_header_value(), "chunk started");
        match self.transfer(&chunk) {
            Ok(n) => {
                tracing::debug!(chunk = chunk.index(), bytes = n, "chunk done");
                Ok(n)
            }
            Err(failure) => Err(ChunkTransferError::new(chunk, item.attempt, failure)),
        }
    }

    fn transfer(&self, chunk: &ChunkRange) -> Result<u64, TransferFailure> {
        if self.cancel.is_cancelled() {
            return Err(TransferFailure::Cancelled);
        }

        let expected = chunk.len();
        let status: Cell<Option<u32>> = Cell::new(None);
        let received = Cell::new(0u64);
        let failure: RefCell<Option<TransferFailure>> = RefCell::new(None);

        let mut easy = self.http.easy(&self.url).map_err(TransferFailure::Curl)?;
        easy.buffer_size(self.http.buffer_size)
            .map_err(TransferFailure::Curl)?;
        easy.range(&chunk.curl_range())
            .map_err(TransferFailure::Curl)?;
        easy.progress(true).map_err(TransferFailure::Curl)?;

        let result = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|line| {
                    // A redirect produces several status lines; the last one wins.
                    if let Some(code) = parse_status_line(line) {
                        status.set(Some(code));
                        return true;
                    }
                    if status.get() != Some(206) {
                        return true;
                    }
                    match parse_content_range_start(line) {
                        Some(got) if got != chunk.start() => {
                            *failure.borrow_mut() = Some(TransferFailure::RangeMismatch {
                                expected: chunk.start(),
                                got,
                            });
                            false
                        }
                        _ => true,
                    }
                })
                .map_err(TransferFailure::Curl)?;
            transfer
                .write_function(|data| {
                    let code = status.get().unwrap_or(0);
                    match code {
                        206 => {}
                        200..=299 if chunk.start() == 0 => {}
                        200..=299 => {
                            *failure.borrow_mut() = Some(TransferFailure::RangeIgnored(code));
                            return Ok(0);
                        }
                        // Error body; the status is reported after perform.
                        _ => return Ok(data.len()),
                    }

                    let off = received.get();
                    let room = expected - off;
                    let take = (data.len() as u64).min(room) as usize;
                    if take > 0 {
                        if let Err(e) = self.storage.write_at(chunk.start() + off, &data[..take]) {
                            *failure.borrow_mut() = Some(TransferFailure::Storage(e));
                            return Ok(0);
                        }
                        received.set(off + take as u64);
                    }
                    if take < data.len() {
                        *failure.borrow_mut() = Some(TransferFailure::Overflow { expected });
                        return Ok(0);
                    }
                    Ok(data.len())
                })
                .map_err(TransferFailure::Curl)?;
            transfer
                .progress_function(|_, _, _, _| !self.cancel.is_cancelled())
                .map_err(TransferFailure::Curl)?;
            transfer.perform()
        };

        if let Some(f) = failure.into_inner() {
            return Err(f);
        }
        if let Err(e) = result {
            if e.is_aborted_by_callback() && self.cancel.is_cancelled() {
                return Err(TransferFailure::Cancelled);
            }
            return Err(TransferFailure::Curl(e));
        }

        let code = match status.get() {
            Some(code) => code,
            None => easy.response_code().map_err(TransferFailure::Curl)?,
        };
        if !(200..300).contains(&code) {
            return Err(TransferFailure::Http(code));
        }

        let received = received.get();
        if received != expected {
            return Err(TransferFailure::PartialTransfer { expected, received });
        }
        Ok(received)
    }
}
