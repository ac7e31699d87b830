//! `vd match` – apply the configured rule lists to a URL.

use anyhow::Result;
use vd_core::config::VdConfig;
use vd_core::rules;

pub fn run_match(cfg: &VdConfig, url: &str) -> Result<()> {
    let signature = rules::match_href(url, &cfg.signature_rules);
    let digest = rules::match_href(url, &cfg.digest_rules);
    if signature.is_none() && digest.is_none() {
        println!("No rule matches {url}.");
        return Ok(());
    }
    if let Some(href) = signature {
        println!("signature: {href}");
    }
    if let Some(href) = digest {
        println!("digest:    {href}");
    }
    Ok(())
}
