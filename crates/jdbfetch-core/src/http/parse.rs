//! Parse HTTP response header lines into HeadResult.

use super::HeadResult;

/// Parse collected header lines into HeadResult. Unknown or malformed lines are skipped.
pub(crate) fn parse_headers(lines: &[String]) -> HeadResult {
    let mut out = HeadResult::default();

    for line in lines {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            out.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            out.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("etag") {
            out.etag = Some(value.trim_matches('"').to_string());
        } else if name.eq_ignore_ascii_case("last-modified") {
            out.last_modified = Some(value.to_string());
        }
    }

    out
}
