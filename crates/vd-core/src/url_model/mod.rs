//! URL modeling and filename derivation.
//!
//! Splits download URLs and host paths into directory and filename parts and
//! derives safe local filenames for the local download manager.

mod path;
mod sanitize;

pub use path::{
    dir_listing_url, file_dir, filename, filename_from_url_path, original_filename, url_filename,
};
pub use sanitize::sanitize_filename;

/// Default filename when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a safe filename for saving a download of `url`.
///
/// # Examples
///
/// - `derive_filename("https://example.com/archive.zip")` → `"archive.zip"`
/// - `derive_filename("https://example.com/")` → `"download.bin"`
pub fn derive_filename(url: &str) -> String {
    let raw = match filename_from_url_path(url) {
        Some(segment) => percent_encoding::percent_decode_str(&segment)
            .decode_utf8_lossy()
            .into_owned(),
        None => return DEFAULT_FILENAME.to_string(),
    };

    let sanitized = sanitize_filename(&raw);
    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_filename_from_url_path() {
        assert_eq!(derive_filename("https://example.com/archive.zip"), "archive.zip");
        assert_eq!(
            derive_filename("https://cdn.example.com/path/to/debian-12.iso.sha256"),
            "debian-12.iso.sha256"
        );
    }

    #[test]
    fn derive_filename_decodes_percent_escapes() {
        assert_eq!(
            derive_filename("https://example.com/my%20file.iso"),
            "my_file.iso"
        );
    }

    #[test]
    fn derive_filename_fallbacks() {
        assert_eq!(derive_filename("https://example.com/"), "download.bin");
        assert_eq!(derive_filename("not a url"), "download.bin");
        assert_eq!(derive_filename("https://example.com/.."), "download.bin");
    }
}
