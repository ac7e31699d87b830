//! Filename heuristics that sort listing links into digest and signature candidates.
//!
//! All comparisons are ASCII case-insensitive and work on the raw (still
//! percent-encoded) last path segment of each link.

use url::Url;

use crate::url_model::url_filename;

/// Suffixes that mark a file as a signature of something else.
pub const SIGNATURE_MARKERS: [&str; 5] = [".asc", ".sig", ".pgp", ".gpg", ".sign"];

/// Detached signature suffixes accepted for `<file><suffix>`.
const SIGNATURE_SUFFIXES: [&str; 4] = [".sig", ".asc", ".pgp", ".gpg"];

const DIGEST_SUFFIXES: [&str; 5] = [".sha512", ".sha256", ".sha1", ".digests", ".hash.txt"];

const MD5_SUFFIX: &str = ".md5";

const AGGREGATE_PREFIXES: [&str; 4] = ["sha512sum", "sha256sum", "sha1sum", "md5sum"];

/// Which digest files count as single-file digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigestProfile {
    /// Also accept `<file>.md5`.
    pub include_md5: bool,
}

impl DigestProfile {
    fn accepts(&self, suffix: &str) -> bool {
        DIGEST_SUFFIXES.contains(&suffix) || (self.include_md5 && suffix == MD5_SUFFIX)
    }
}

/// Links named exactly `filename` + a digest suffix (`.sha256`, `.digests`, ...).
pub fn filter_digest_file_links(filename: &str, urls: &[Url], profile: DigestProfile) -> Vec<Url> {
    matching(urls, |name| {
        suffix_after(name, filename).is_some_and(|suffix| profile.accepts(&suffix))
    })
}

/// Links to aggregated sum files (`SHA256SUMS`, `sha1sum.txt`, `md5sums`, ...).
pub fn filter_aggregate_sum_links(urls: &[Url]) -> Vec<Url> {
    matching(urls, |name| {
        AGGREGATE_PREFIXES.iter().any(|prefix| {
            name.strip_prefix(prefix)
                .is_some_and(|rest| !carries_signature_marker(rest))
        })
    })
}

/// Links named exactly `filename` + a detached signature suffix.
pub fn filter_signature_links(filename: &str, urls: &[Url]) -> Vec<Url> {
    matching(urls, |name| {
        suffix_after(name, filename).is_some_and(|suffix| SIGNATURE_SUFFIXES.contains(&suffix.as_str()))
    })
}

/// Digest candidates for `filename`: single-file digests when there are any,
/// aggregated sum files otherwise.
pub fn digest_candidates(filename: &str, urls: &[Url], profile: DigestProfile) -> Vec<Url> {
    let single = filter_digest_file_links(filename, urls, profile);
    if single.is_empty() {
        filter_aggregate_sum_links(urls)
    } else {
        single
    }
}

/// Picks a candidate: the first one in document order.
// TODO: rank candidates (prefer stronger digests, signed sums) instead of taking the first.
pub fn select_first(candidates: Vec<Url>) -> Option<Url> {
    candidates.into_iter().next()
}

fn matching(urls: &[Url], pred: impl Fn(&str) -> bool) -> Vec<Url> {
    urls.iter()
        .filter(|url| pred(url_filename(url).to_ascii_lowercase().as_str()))
        .cloned()
        .collect()
}

/// Lower-cased remainder of `name` after `filename`, if `name` starts with it.
fn suffix_after(name: &str, filename: &str) -> Option<String> {
    let base = filename.to_ascii_lowercase();
    if base.is_empty() {
        return None;
    }
    name.strip_prefix(base.as_str()).map(str::to_string)
}

fn carries_signature_marker(name: &str) -> bool {
    SIGNATURE_MARKERS.iter().any(|marker| name.contains(marker))
}
