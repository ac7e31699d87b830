//! Directory listing autodetection: which links next to a download look like
//! its digest or signature file.
//!
//! Pure functions over a fetched listing page. When several candidates match,
//! the first one in document order is used.

mod filter;
mod links;

pub use filter::{
    digest_candidates, filter_aggregate_sum_links, filter_digest_file_links,
    filter_signature_links, select_first, DigestProfile, SIGNATURE_MARKERS,
};
pub use links::extract_same_origin_links;
