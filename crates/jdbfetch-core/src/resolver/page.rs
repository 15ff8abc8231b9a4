//! Landing page resolver: scrape the download URL and checksum out of HTML.

use regex::Regex;

use crate::checksum::Checksum;
use crate::http::{self, HttpOptions};
use crate::target::DownloadTarget;

use super::{probe_size, ResolutionError, TargetResolver};

/// Landing page that links the current definitions file.
pub const DEFAULT_PAGE_URL: &str = "http://www.symantec.com/avcenter/download/pages/CS-SAVCE.html";
/// Download URL embedded in the landing page.
pub const DEFAULT_URL_PATTERN: &str = r"http://definitions\.symantec\.com/defs/jdb/vd[0-9]{6}\.jdb";
/// Checksum tokens on the landing page (uppercase MD5).
pub const DEFAULT_CHECKSUM_PATTERN: &str = r"[A-F0-9]{32}";
/// The file's checksum is the third token on the page.
pub const DEFAULT_CHECKSUM_INDEX: usize = 2;

/// Compiled patterns for scanning a landing page.
#[derive(Debug, Clone)]
pub struct PagePatterns {
    url: Regex,
    checksum: Regex,
    checksum_index: usize,
}

impl PagePatterns {
    /// `checksum_index` is 0-based: which checksum-pattern match belongs to the file.
    pub fn new(
        url_pattern: &str,
        checksum_pattern: &str,
        checksum_index: usize,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            url: Regex::new(url_pattern)?,
            checksum: Regex::new(checksum_pattern)?,
            checksum_index,
        })
    }
}

/// What a landing page says about the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScan {
    pub download_url: String,
    pub checksum: Checksum,
}

/// Finds the first download URL and the configured checksum token in `html`.
pub fn scan_page(
    page_url: &str,
    html: &str,
    patterns: &PagePatterns,
) -> Result<PageScan, ResolutionError> {
    let download_url = patterns
        .url
        .find(html)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ResolutionError::UrlNotFound {
            page: page_url.to_string(),
            pattern: patterns.url.as_str().to_string(),
        })?;

    let tokens: Vec<&str> = patterns.checksum.find_iter(html).map(|m| m.as_str()).collect();
    let token = tokens
        .get(patterns.checksum_index)
        .ok_or_else(|| ResolutionError::ChecksumNotFound {
            page: page_url.to_string(),
            pattern: patterns.checksum.as_str().to_string(),
            index: patterns.checksum_index,
            found: tokens.len(),
        })?;
    let checksum = token
        .parse::<Checksum>()
        .map_err(|reason| ResolutionError::InvalidChecksum {
            token: token.to_string(),
            reason,
        })?;

    Ok(PageScan {
        download_url,
        checksum,
    })
}

/// GET landing page → scan → HEAD download URL for its size.
pub struct PageResolver {
    patterns: PagePatterns,
    http: HttpOptions,
}

impl PageResolver {
    pub fn new(patterns: PagePatterns, http: HttpOptions) -> Self {
        Self { patterns, http }
    }
}

impl TargetResolver for PageResolver {
    fn resolve(&self, location: &str) -> Result<DownloadTarget, ResolutionError> {
        let html = http::get_text(location, &self.http).map_err(ResolutionError::PageUnreachable)?;
        let scan = scan_page(location, &html, &self.patterns)?;
        tracing::debug!(page = location, url = %scan.download_url, checksum = %scan.checksum, "scanned landing page");

        let size = probe_size(&scan.download_url, &self.http)?;
        DownloadTarget::from_url(scan.download_url.clone(), size, scan.checksum).ok_or(
            ResolutionError::NoFileName {
                url: scan.download_url,
            },
        )
    }
}
