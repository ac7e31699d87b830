//! `vd scan` – show what autodetection would pick from a directory listing.

use anyhow::{Context, Result};
use url::Url;
use vd_core::config::VdConfig;
use vd_core::fetch::{bounded_fetch, CurlFetcher, DirectoryFetcher};
use vd_core::listing::{digest_candidates, extract_same_origin_links, filter_signature_links};
use vd_core::url_model::{dir_listing_url, url_filename};

pub async fn run_scan(cfg: &VdConfig, url: &str) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("invalid URL {url}"))?;
    let listing = dir_listing_url(&url)?;
    let fetcher = CurlFetcher::new();
    let html = bounded_fetch(&listing, cfg.fetch_timeout(), fetcher.get_text(&listing)).await?;
    let links = extract_same_origin_links(&html, &listing);
    let filename = url_filename(&url);

    println!("{} links in {}", links.len(), listing);
    let signatures = filter_signature_links(filename, &links);
    let digests = digest_candidates(filename, &links, cfg.digest_profile());
    print_list("signatures", &signatures);
    print_list("digests", &digests);
    for digest in &digests {
        let signed = filter_signature_links(url_filename(digest), &links);
        if !signed.is_empty() {
            print_list(&format!("signatures of {}", url_filename(digest)), &signed);
        }
    }
    Ok(())
}

fn print_list(label: &str, urls: &[Url]) {
    if urls.is_empty() {
        println!("{label}: none");
        return;
    }
    println!("{label}:");
    for url in urls {
        println!("  {url}");
    }
}
