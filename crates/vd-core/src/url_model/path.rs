//! Filename and directory extraction from URLs and host paths.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{Result, VdError};

/// Extracts the last non-empty path segment from a URL for use as a filename hint.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Last path segment of `url` exactly as it appears (still percent-encoded).
/// Empty for URLs ending in `/`.
pub fn url_filename(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
}

/// Last component of a URL or a local path (`/` or `\`), without its `#fragment`.
pub fn filename(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let last = normalized.rsplit('/').next().unwrap_or_default();
    last.split('#').next().unwrap_or_default().to_string()
}

/// Everything up to and including the last separator; empty when there is none.
pub fn file_dir(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.rfind('/') {
        Some(idx) => normalized[..=idx].to_string(),
        None => String::new(),
    }
}

/// URL of the directory listing that contains `url`. Query and fragment are
/// dropped before the last path segment is.
pub fn dir_listing_url(url: &Url) -> Result<Url> {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.join(".").map_err(|source| VdError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

/// Human-readable name of the file behind `url` (percent-decoded).
pub fn original_filename(url: &str) -> String {
    percent_decode_str(&filename(url))
        .decode_utf8_lossy()
        .into_owned()
}
