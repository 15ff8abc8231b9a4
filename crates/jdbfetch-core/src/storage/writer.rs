//! Concurrent offset writer for the temp output file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writer for the temp output file. Safe to clone and use from multiple
/// workers; each `write_at` is an independent positioned write (pwrite-style)
/// and never touches a shared cursor. Callers are responsible for keeping
/// their offset ranges disjoint.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    /// Create from an open file and path (used by StorageWriterBuilder).
    pub(crate) fn from_file_and_path(file: File, temp_path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            temp_path,
        }
    }

    /// Write all of `data` at `offset`.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(data, offset)
    }

    /// Write all of `data` at `offset`.
    #[cfg(windows)]
    pub fn write_at(&self, offset: u64, mut data: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        let mut offset = offset;
        while !data.is_empty() {
            let n = self.file.seek_write(data, offset)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "short positioned write"));
            }
            data = &data[n..];
            offset += n as u64;
        }
        Ok(())
    }

    /// Sync file data and metadata to disk. Must run before the digest is computed.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("storage sync failed")?;
        Ok(())
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the temp file to the final path. Consumes the writer and closes the file.
    /// Call `sync` before this if you need durability. Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_path = self.temp_path;
        drop(self.file);

        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }

    /// Close and delete the temp file. A file that is already gone is not an error.
    pub fn discard(self) -> Result<()> {
        let temp_path = self.temp_path;
        drop(self.file);

        match std::fs::remove_file(&temp_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", temp_path.display())),
        }
    }
}
