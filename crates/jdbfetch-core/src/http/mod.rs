//! Thin libcurl helpers shared by the resolver and the chunk downloader.
//!
//! Every handle gets the same connect timeout, low-speed abort and hard
//! request timeout so a stalled server cannot hold a worker forever.

mod head;
mod page;
mod parse;

pub use head::{probe, HeadResult};
pub use page::{get_text, MAX_PAGE_BYTES};

use std::time::Duration;
use thiserror::Error;

/// Error from a HEAD probe or a page GET.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{url}: {error}")]
    Curl { url: String, error: curl::Error },
    #[error("{method} {url} returned HTTP {code}")]
    Status {
        method: &'static str,
        url: String,
        code: u32,
    },
    #[error("{url}: response body exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },
}

impl HttpError {
    pub(crate) fn curl(url: &str) -> impl FnOnce(curl::Error) -> HttpError + '_ {
        move |error| HttpError::Curl {
            url: url.to_string(),
            error,
        }
    }
}

/// Per-handle curl settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Hard wall-clock limit for one request, body included.
    pub request_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Receive buffer size: upper bound on the bytes handed to one write callback.
    pub buffer_size: usize,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(3600),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            buffer_size: 16 * 1024,
            user_agent: format!("jdbfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpOptions {
    /// New easy handle for `url` with redirects, timeouts and user agent applied.
    pub(crate) fn easy(&self, url: &str) -> Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        easy.timeout(self.request_timeout)?;
        Ok(easy)
    }
}

/// Parses the status code out of an HTTP status line (`HTTP/1.1 206 Partial Content`).
/// Returns `None` for ordinary header lines.
pub(crate) fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// First byte offset of a `Content-Range: bytes <start>-<end>/<total>` header
/// line. `None` for any other line, including the unsatisfied `bytes */<total>`
/// form.
pub(crate) fn parse_content_range_start(line: &[u8]) -> Option<u64> {
    let line = std::str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-range") {
        return None;
    }
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = spec.split_once('-')?;
    start.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parsing() {
        assert_eq!(parse_status_line(b"HTTP/1.1 206 Partial Content\r\n"), Some(206));
        assert_eq!(parse_status_line(b"HTTP/2 200\r\n"), Some(200));
        assert_eq!(parse_status_line(b"Content-Length: 10\r\n"), None);
        assert_eq!(parse_status_line(b"HTTP/1.1 abc\r\n"), None);
    }

    #[test]
    fn content_range_start() {
        assert_eq!(
            parse_content_range_start(b"Content-Range: bytes 65536-131071/200000\r\n"),
            Some(65536)
        );
        assert_eq!(parse_content_range_start(b"content-range: bytes 0-9/10\r\n"), Some(0));
        assert_eq!(parse_content_range_start(b"Content-Range: bytes */10\r\n"), None);
        assert_eq!(parse_content_range_start(b"Content-Length: 10\r\n"), None);
        assert_eq!(parse_content_range_start(b"HTTP/1.1 206 Partial Content\r\n"), None);
    }

    #[test]
    fn default_options() {
        let o = HttpOptions::default();
        assert_eq!(o.connect_timeout, Duration::from_secs(30));
        assert_eq!(o.low_speed_limit, 1024);
        assert!(o.user_agent.starts_with("jdbfetch/"));
    }
}
