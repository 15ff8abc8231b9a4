//! Turning a landing page (or a direct URL) into a `DownloadTarget`.
//!
//! The engine only depends on the `TargetResolver` trait and never sees a
//! half-resolved target: every failure is a typed `ResolutionError`.

mod direct;
mod page;

pub use direct::DirectResolver;
pub use page::{
    scan_page, PagePatterns, PageResolver, PageScan, DEFAULT_CHECKSUM_INDEX,
    DEFAULT_CHECKSUM_PATTERN, DEFAULT_PAGE_URL, DEFAULT_URL_PATTERN,
};

use thiserror::Error;

use crate::checksum::ChecksumParseError;
use crate::http::{self, HttpError, HttpOptions};
use crate::target::DownloadTarget;

/// Fatal failure before any chunk is downloaded.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("landing page unreachable: {0}")]
    PageUnreachable(HttpError),
    #[error("no download URL matching `{pattern}` on {page}")]
    UrlNotFound { page: String, pattern: String },
    #[error("checksum token #{index} matching `{pattern}` not found on {page} ({found} tokens present)")]
    ChecksumNotFound {
        page: String,
        pattern: String,
        index: usize,
        found: usize,
    },
    #[error("invalid checksum {token:?}: {reason}")]
    InvalidChecksum {
        token: String,
        reason: ChecksumParseError,
    },
    #[error("size probe failed: {0}")]
    ProbeFailed(HttpError),
    #[error("{url}: HEAD response has no Content-Length")]
    MissingContentLength { url: String },
    #[error("{url}: no usable file name in URL")]
    NoFileName { url: String },
}

/// Produces the target for one run. `location` is the landing page for page
/// resolvers and the file URL itself for direct resolvers.
pub trait TargetResolver {
    fn resolve(&self, location: &str) -> Result<DownloadTarget, ResolutionError>;
}

/// HEADs `url` and returns its `Content-Length`.
pub(crate) fn probe_size(url: &str, opts: &HttpOptions) -> Result<u64, ResolutionError> {
    let head = http::probe(url, opts).map_err(ResolutionError::ProbeFailed)?;
    tracing::debug!(
        url,
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        etag = ?head.etag,
        last_modified = ?head.last_modified,
        "probed download URL"
    );
    if !head.accept_ranges {
        tracing::warn!(url, "server does not advertise Accept-Ranges: bytes");
    }
    head.content_length
        .ok_or_else(|| ResolutionError::MissingContentLength {
            url: url.to_string(),
        })
}
