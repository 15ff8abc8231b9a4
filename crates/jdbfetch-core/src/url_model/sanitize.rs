//! Filename sanitization for the local output file.

/// Linux NAME_MAX, in bytes.
const NAME_MAX: usize = 255;

/// Makes a URL path segment safe to use as a local filename.
///
/// Separators, NUL and control characters become `_` (runs collapsed),
/// leading/trailing dots, spaces and underscores are trimmed, and the result
/// is cut to 255 bytes on a char boundary.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        let unsafe_char = matches!(c, '\0' | '/' | '\\' | ' ' | '\t') || c.is_control();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| matches!(c, ' ' | '.' | '_'));
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
