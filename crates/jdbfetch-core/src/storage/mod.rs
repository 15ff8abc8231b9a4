//! Disk I/O and output file lifecycle.
//!
//! Creates and pre-sizes the temp file (fallocate on Linux when available,
//! else set_len), supports concurrent offset writes (pwrite), fsync before
//! verification, and either atomic finalize (rename from `.part` to the final
//! name) or discard.

mod builder;
mod writer;

pub use builder::{Allocation, StorageWriterBuilder};
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `vd123456.jdb` → `vd123456.jdb.part`).
pub fn temp_path(final_path: &std::path::Path) -> std::path::PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    fn open_writer(path: &Path, size: u64) -> StorageWriter {
        let mut builder = StorageWriterBuilder::create(path).unwrap();
        builder.preallocate(size).unwrap();
        builder.build()
    }

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("vd1a2b3c.jdb"));
        assert_eq!(p.to_string_lossy(), "vd1a2b3c.jdb.part");
        let p2 = temp_path(Path::new("/tmp/defs/vd000001.jdb"));
        assert_eq!(p2.to_string_lossy(), "/tmp/defs/vd000001.jdb.part");
    }

    #[test]
    fn create_preallocate_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.bin");
        let tp = temp_path(&final_path);

        let writer = open_writer(&tp, 100);
        assert_eq!(std::fs::metadata(&tp).unwrap().len(), 100);

        writer.write_at(0, b"hello").unwrap();
        writer.write_at(50, b"world").unwrap();
        writer.write_at(95, b"xy").unwrap();
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        let buf = std::fs::read(&final_path).unwrap();
        assert_eq!(buf.len(), 100);
        assert_eq!(&buf[0..5], b"hello");
        assert_eq!(&buf[50..55], b"world");
        assert_eq!(&buf[95..97], b"xy");
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("stale.part");
        std::fs::write(&tp, vec![7u8; 64]).unwrap();

        let writer = open_writer(&tp, 8);
        writer.sync().unwrap();
        assert_eq!(std::fs::read(&tp).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn zero_size_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("empty.part");
        let writer = open_writer(&tp, 0);
        writer.sync().unwrap();
        assert_eq!(std::fs::metadata(&tp).unwrap().len(), 0);
    }

    #[test]
    fn discard_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("doomed.part");
        let writer = open_writer(&tp, 16);
        writer.write_at(0, b"abc").unwrap();
        writer.discard().unwrap();
        assert!(!tp.exists());
    }

    #[test]
    fn concurrent_disjoint_writes_match_sequential() {
        const CHUNK: usize = 4096;
        const CHUNKS: usize = 24;
        let data: Vec<u8> = (0..CHUNK * CHUNKS).map(|i| (i * 31 % 251) as u8).collect();
        let data = Arc::new(data);

        let dir = tempfile::tempdir().unwrap();

        let seq_path = dir.path().join("seq.part");
        let seq = open_writer(&seq_path, data.len() as u64);
        for i in 0..CHUNKS {
            let off = i * CHUNK;
            seq.write_at(off as u64, &data[off..off + CHUNK]).unwrap();
        }
        seq.sync().unwrap();

        let par_path = dir.path().join("par.part");
        let par = open_writer(&par_path, data.len() as u64);
        // Reverse-ish interleaving, each thread writes its chunk in small pieces.
        let handles: Vec<_> = (0..CHUNKS)
            .rev()
            .map(|i| {
                let w = par.clone();
                let data = Arc::clone(&data);
                std::thread::spawn(move || {
                    let off = i * CHUNK;
                    for (n, bytes) in data[off..off + CHUNK].chunks(100).enumerate() {
                        w.write_at((off + n * 100) as u64, bytes).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        par.sync().unwrap();

        let a = std::fs::read(&seq_path).unwrap();
        let b = std::fs::read(&par_path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, *data);
    }
}
