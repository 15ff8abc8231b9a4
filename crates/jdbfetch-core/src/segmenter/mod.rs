//! Range math and chunk planning.
//!
//! Splits a download into fixed-size chunks, computes HTTP Range header bounds,
//! and tracks which chunks have completed during a run.

mod bitmap;
mod range;

pub use bitmap::ChunkBitmap;
pub use range::{chunk_count, plan_chunks, ChunkRange, DEFAULT_CHUNK_SIZE, MAX_CHUNKS};
