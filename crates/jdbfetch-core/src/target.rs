//! The resolved download target.

use crate::checksum::Checksum;
use crate::url_model;

/// What to download and how to check it: `{url, name, size, checksum}`.
///
/// Built once by a resolver and read-only afterwards; fields are private so a
/// target can only exist with a parseable URL basename and a valid checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    url: String,
    name: String,
    size: u64,
    checksum: Checksum,
}

impl DownloadTarget {
    /// Builds a target whose local name is the URL's basename.
    /// Returns `None` if the URL has no usable basename.
    pub fn from_url(url: impl Into<String>, size: u64, checksum: Checksum) -> Option<Self> {
        let url = url.into();
        let name = url_model::derive_filename(&url)?;
        Some(Self {
            url,
            name,
            size,
            checksum,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Local filename (URL basename).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}
