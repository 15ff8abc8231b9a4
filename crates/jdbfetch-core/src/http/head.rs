//! HTTP HEAD probe: total size and range support of the download URL.

use std::str;

use super::{parse, HttpError, HttpOptions};

/// Result of a HEAD request: the headers needed to plan a chunked download.
#[derive(Debug, Clone, Default)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` value if present.
    pub etag: Option<String>,
    /// `Last-Modified` value if present.
    pub last_modified: Option<String>,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects; only the headers of the final response are kept.
/// Runs in the current thread.
pub fn probe(url: &str, opts: &HttpOptions) -> Result<HeadResult, HttpError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = opts.easy(url).map_err(HttpError::curl(url))?;
    easy.nobody(true).map_err(HttpError::curl(url))?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if super::parse_status_line(data).is_some() {
                    // A new response in a redirect chain starts here.
                    headers.clear();
                }
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(HttpError::curl(url))?;
        transfer.perform().map_err(HttpError::curl(url))?;
    }

    let code = easy.response_code().map_err(HttpError::curl(url))?;
    if !(200..300).contains(&code) {
        return Err(HttpError::Status {
            method: "HEAD",
            url: url.to_string(),
            code,
        });
    }

    Ok(parse::parse_headers(&headers))
}
