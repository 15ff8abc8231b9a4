//! Local filename derivation from the download URL.

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;

/// Derives a safe local filename from the last path segment of `url`.
///
/// Returns `None` when the URL has no usable basename (root path, `.`/`..`,
/// or nothing left after sanitizing).
///
/// - `derive_filename("http://definitions.symantec.com/defs/jdb/vd5a1c03.jdb")` → `Some("vd5a1c03.jdb")`
pub fn derive_filename(url: &str) -> Option<String> {
    let raw = filename_from_url_path(url)?;
    let sanitized = sanitize_filename(&raw);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        None
    } else {
        Some(sanitized)
    }
}
