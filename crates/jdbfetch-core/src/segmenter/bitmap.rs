//! Chunk completion bitmap for one run.

/// One bit per planned chunk (LSB of byte 0 = chunk 0). A chunk's bit is set
/// only once it has reached `succeeded`; the download is complete when every
/// bit in `[0, chunk_count)` is set.
#[derive(Debug, Clone, Default)]
pub struct ChunkBitmap {
    bytes: Vec<u8>,
    chunk_count: usize,
    completed: usize,
}

impl ChunkBitmap {
    /// New empty bitmap with capacity for `chunk_count` bits.
    pub fn new(chunk_count: usize) -> Self {
        ChunkBitmap {
            bytes: vec![0u8; chunk_count.div_ceil(8)],
            chunk_count,
            completed: 0,
        }
    }

    /// Mark chunk at `index` as completed. Returns false if it was already set
    /// or is out of range.
    pub fn set_completed(&mut self, index: usize) -> bool {
        if index >= self.chunk_count || self.is_completed(index) {
            return false;
        }
        self.bytes[index / 8] |= 1 << (index % 8);
        self.completed += 1;
        true
    }

    /// True if chunk at `index` is marked completed.
    pub fn is_completed(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .map(|&b| (b & (1 << (index % 8))) != 0)
            .unwrap_or(false)
    }

    /// Number of chunks marked completed.
    pub fn completed_count(&self) -> usize {
        self.completed
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// True if every planned chunk is completed (trivially true for zero chunks).
    pub fn all_completed(&self) -> bool {
        self.completed == self.chunk_count
    }

    /// Indices of chunks not yet completed, ascending.
    pub fn missing(&self) -> Vec<usize> {
        (0..self.chunk_count)
            .filter(|&i| !self.is_completed(i))
            .collect()
    }
}
