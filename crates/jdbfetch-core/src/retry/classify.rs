//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::error::TransferFailure;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        408 => ErrorKind::Timeout,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_aborted_by_callback() || e.is_url_malformed() || e.is_unsupported_protocol() {
        return ErrorKind::Other;
    }
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    // Everything else libcurl reports on a transfer is network-level:
    // connect/resolve failures, resets, partial bodies, TLS errors.
    ErrorKind::Connection
}

/// Classify a chunk failure into an ErrorKind.
pub fn classify(failure: &TransferFailure) -> ErrorKind {
    match failure {
        TransferFailure::Curl(e) => classify_curl_error(e),
        TransferFailure::Http(code) => classify_http_status(*code),
        // Both look like a confused proxy or cache; a fresh request may not be.
        TransferFailure::PartialTransfer { .. } | TransferFailure::RangeMismatch { .. } => {
            ErrorKind::Connection
        }
        TransferFailure::Storage(_) => ErrorKind::Storage,
        TransferFailure::RangeIgnored(_)
        | TransferFailure::Overflow { .. }
        | TransferFailure::Cancelled => ErrorKind::Other,
    }
}
