//! Chunk type and range planning.

use std::fmt;
use std::num::NonZeroU64;

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: NonZeroU64 = match NonZeroU64::new(1024 * 1024) {
    Some(n) => n,
    None => unreachable!(),
};

/// A single planned chunk: byte range [start, end) (half-open), never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    index: usize,
    start: u64,
    end: u64,
}

impl ChunkRange {
    /// Returns `None` when `start >= end`.
    pub fn new(index: usize, start: u64, end: u64) -> Option<Self> {
        if start >= end {
            return None;
        }
        Some(Self { index, start, end })
    }

    /// Position of this chunk in the plan (0-based, ascending offset order).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Start offset (inclusive).
    pub fn start(&self) -> u64 {
        self.start
    }

    /// End offset (exclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Length of this chunk in bytes (always > 0).
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Value for libcurl's range option: `start-(end-1)`, inclusive on both sides.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end - 1)
    }

    /// HTTP Range header value (inclusive end): `bytes=start-(end-1)`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}", self.curl_range())
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk {} [{}, {})", self.index, self.start, self.end)
    }
}

/// Largest plan the engine will build. At the default chunk size this is a
/// 1 TiB file; anything larger is refused before planning.
pub const MAX_CHUNKS: u64 = 1 << 20;

/// Number of chunks `plan_chunks` would produce, without allocating.
pub fn chunk_count(total_size: u64, chunk_size: NonZeroU64) -> u64 {
    total_size.div_ceil(chunk_size.get())
}

/// Plans `ceil(total_size / chunk_size)` chunks; chunk `i` covers
/// `[i * chunk_size, min((i + 1) * chunk_size, total_size))`.
///
/// Returns an empty vec if `total_size` is 0. Callers taking the size from
/// a server check `chunk_count` against `MAX_CHUNKS` first.
pub fn plan_chunks(total_size: u64, chunk_size: NonZeroU64) -> Vec<ChunkRange> {
    let count = chunk_count(total_size, chunk_size).min(MAX_CHUNKS);
    let chunk_size = chunk_size.get();

    let mut out = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    let mut start = 0u64;
    let mut index = 0usize;
    while start < total_size {
        let end = start.saturating_add(chunk_size).min(total_size);
        out.push(ChunkRange { index, start, end });
        start = end;
        index += 1;
    }

    out
}
