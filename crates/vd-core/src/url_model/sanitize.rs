//! Filename sanitization for files saved into the download directory.

/// Longest name most filesystems accept (NAME_MAX).
const NAME_MAX: usize = 255;

/// Sanitizes a candidate filename so it can be created in the download directory.
///
/// - Replaces separators, NUL, control characters and the characters Windows
///   rejects (`<>:"|?*`) with `_`, collapsing runs of `_`
/// - Trims leading/trailing dots, spaces and underscores
/// - Limits the result to 255 bytes on a char boundary
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let bad = c.is_control()
            || c.is_whitespace()
            || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*');
        if !bad {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
