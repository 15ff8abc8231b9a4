//! Checksum values and post-download integrity verification.
//!
//! The digest is computed on demand over the finished file, never inline with
//! the chunk writes, so it always sees the bytes as they landed on disk.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const BUF_SIZE: usize = 64 * 1024;

/// Digest algorithm, inferred from the length of the expected hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// 128-bit MD5, 32 hex digits (what the definitions page publishes).
    Md5,
    /// SHA-256, 64 hex digits.
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgorithm::Md5 => 32,
            ChecksumAlgorithm::Sha256 => 64,
        }
    }

    fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(ChecksumAlgorithm::Md5),
            64 => Some(ChecksumAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumAlgorithm::Md5 => write!(f, "MD5"),
            ChecksumAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChecksumParseError {
    #[error("checksum has {0} hex digits; expected 32 (MD5) or 64 (SHA-256)")]
    BadLength(usize),
    #[error("checksum contains non-hex character {0:?}")]
    NotHex(char),
}

/// A validated, fixed-length hex checksum, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl Checksum {
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Uppercase hex digits.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }
}

impl FromStr for Checksum {
    type Err = ChecksumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ChecksumParseError::NotHex(c));
        }
        let algorithm =
            ChecksumAlgorithm::from_hex_len(s.len()).ok_or(ChecksumParseError::BadLength(s.len()))?;
        Ok(Checksum {
            algorithm,
            hex: s.to_ascii_uppercase(),
        })
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Terminal verification failure for a run.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// Digest disagreement. The file has already been deleted when this is returned.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("cannot read {} for checksum: {error}", path.display())]
    Read { path: PathBuf, error: io::Error },
}

/// Streaming digest over any reader, returned as uppercase hex.
pub fn digest_reader<R: Read>(mut reader: R, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let mut buf = vec![0u8; BUF_SIZE];
    match algorithm {
        ChecksumAlgorithm::Md5 => {
            let mut ctx = md5::Context::new();
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                ctx.consume(&buf[..n]);
            }
            Ok(hex::encode_upper(ctx.compute().0))
        }
        ChecksumAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hex::encode_upper(hasher.finalize()))
        }
    }
}

/// Compute the digest of a file and return it as uppercase hex.
/// Reads in fixed-size blocks to keep memory use bounded; suitable for large files.
pub fn digest_path(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    let f = File::open(path)?;
    digest_reader(f, algorithm)
}

/// Verifies `path` against `expected`. On success returns the computed digest
/// and leaves the file in place; on mismatch deletes the file and returns
/// `IntegrityError::Mismatch`.
pub fn verify_file(path: &Path, expected: &Checksum) -> Result<String, IntegrityError> {
    let actual = digest_path(path, expected.algorithm()).map_err(|error| IntegrityError::Read {
        path: path.to_path_buf(),
        error,
    })?;

    if actual == expected.as_hex() {
        tracing::info!(
            path = %path.display(),
            algorithm = %expected.algorithm(),
            digest = %actual,
            "checksum verified"
        );
        return Ok(actual);
    }

    tracing::error!(
        path = %path.display(),
        expected = %expected.as_hex(),
        actual = %actual,
        "checksum mismatch"
    );
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!(path = %path.display(), "deleted file that failed verification"),
        Err(e) => tracing::error!(path = %path.display(), error = %e, "could not delete file that failed verification"),
    }
    Err(IntegrityError::Mismatch {
        path: path.to_path_buf(),
        expected: expected.as_hex().to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EMPTY_MD5: &str = "D41D8CD98F00B204E9800998ECF8427E";
    const HELLO_MD5: &str = "B1946AC92492D2347C6235B4D2611184";
    const EMPTY_SHA256: &str = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855";
    const HELLO_SHA256: &str = "5891B5B522D5DF086D0FF0B110FBD9D21BB4FC7163AF34D08286A2E846F6BE03";

    fn file_with(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn parse_infers_algorithm_and_uppercases() {
        let c: Checksum = HELLO_MD5.to_ascii_lowercase().parse().unwrap();
        assert_eq!(c.algorithm(), ChecksumAlgorithm::Md5);
        assert_eq!(c.as_hex(), HELLO_MD5);

        let c: Checksum = HELLO_SHA256.parse().unwrap();
        assert_eq!(c.algorithm(), ChecksumAlgorithm::Sha256);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            "ABC".parse::<Checksum>(),
            Err(ChecksumParseError::BadLength(3))
        );
        let bad = format!("{}Z", &HELLO_MD5[..31]);
        assert_eq!(bad.parse::<Checksum>(), Err(ChecksumParseError::NotHex('Z')));
    }

    #[test]
    fn md5_known_values() {
        let f = file_with(b"");
        assert_eq!(digest_path(f.path(), ChecksumAlgorithm::Md5).unwrap(), EMPTY_MD5);
        let f = file_with(b"hello\n");
        assert_eq!(digest_path(f.path(), ChecksumAlgorithm::Md5).unwrap(), HELLO_MD5);
    }

    #[test]
    fn sha256_known_values() {
        let f = file_with(b"");
        assert_eq!(
            digest_path(f.path(), ChecksumAlgorithm::Sha256).unwrap(),
            EMPTY_SHA256
        );
        let f = file_with(b"hello\n");
        assert_eq!(
            digest_path(f.path(), ChecksumAlgorithm::Sha256).unwrap(),
            HELLO_SHA256
        );
    }

    #[test]
    fn chunk_assembled_file_matches_one_pass_digest() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 253) as u8).collect();
        let one_pass = digest_reader(&data[..], ChecksumAlgorithm::Md5).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembled.bin");
        let file = File::options()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.set_len(data.len() as u64).unwrap();
        // Write 7 KiB pieces back to front.
        let pieces: Vec<(usize, &[u8])> = data.chunks(7 * 1024).enumerate().collect();
        for (i, piece) in pieces.into_iter().rev() {
            #[cfg(unix)]
            {
                use std::os::unix::fs::FileExt;
                file.write_all_at(piece, (i * 7 * 1024) as u64).unwrap();
            }
            #[cfg(not(unix))]
            {
                use std::io::{Seek, SeekFrom};
                let mut f = &file;
                f.seek(SeekFrom::Start((i * 7 * 1024) as u64)).unwrap();
                f.write_all(piece).unwrap();
            }
        }
        file.sync_all().unwrap();

        assert_eq!(digest_path(&path, ChecksumAlgorithm::Md5).unwrap(), one_pass);
    }

    #[test]
    fn verify_match_keeps_file() {
        let f = file_with(b"hello\n");
        let expected: Checksum = HELLO_MD5.parse().unwrap();
        let digest = verify_file(f.path(), &expected).unwrap();
        assert_eq!(digest, HELLO_MD5);
        assert!(f.path().exists());
    }

    #[test]
    fn verify_mismatch_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jdb");
        std::fs::write(&path, b"corrupted").unwrap();
        let expected: Checksum = HELLO_MD5.parse().unwrap();

        match verify_file(&path, &expected) {
            Err(IntegrityError::Mismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, HELLO_MD5);
                assert_ne!(actual, HELLO_MD5);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn verify_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let expected: Checksum = EMPTY_MD5.parse().unwrap();
        let err = verify_file(&dir.path().join("nope"), &expected).unwrap_err();
        assert!(matches!(err, IntegrityError::Read { .. }));
    }
}
