//! Opening and sizing `<name>.part` before any chunk is written.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::writer::StorageWriter;

/// How the `.part` file got its final length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Nothing to reserve.
    Empty,
    /// Blocks reserved up front with `posix_fallocate`; a full disk fails here
    /// rather than halfway through the run.
    Reserved,
    /// Sparse file extended with `set_len`.
    Sparse,
}

/// A freshly truncated `.part` file not yet shared with the workers.
pub struct StorageWriterBuilder {
    file: File,
    temp_path: PathBuf,
}

impl StorageWriterBuilder {
    /// Opens `temp_path` read/write, truncating leftovers of an earlier run.
    pub fn create(temp_path: &Path) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("creating {}", temp_path.display()))?;
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Sizes the file to the announced definitions size so every chunk can be
    /// written at its own offset in any order.
    pub fn preallocate(&mut self, size: u64) -> Result<Allocation> {
        if size == 0 {
            return Ok(Allocation::Empty);
        }
        if i64::try_from(size).is_err() {
            bail!("{} bytes is beyond the largest file offset", size);
        }
        let allocation = if reserve(&self.file, size) {
            Allocation::Reserved
        } else {
            self.file
                .set_len(size)
                .with_context(|| format!("sizing {} to {} bytes", self.temp_path.display(), size))?;
            Allocation::Sparse
        };
        tracing::debug!(path = %self.temp_path.display(), size, ?allocation, "part file sized");
        Ok(allocation)
    }

    pub fn build(self) -> StorageWriter {
        StorageWriter::from_file_and_path(self.file, self.temp_path)
    }
}

#[cfg(unix)]
fn reserve(file: &File, size: u64) -> bool {
    use std::os::unix::io::AsRawFd;

    let Ok(len) = libc::off_t::try_from(size) else {
        return false;
    };
    // SAFETY: the descriptor belongs to `file`, which outlives the call.
    let r = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
    if r != 0 {
        tracing::debug!(errno = r, "posix_fallocate unavailable, using a sparse file");
    }
    r == 0
}

#[cfg(not(unix))]
fn reserve(_file: &File, _size: u64) -> bool {
    false
}
