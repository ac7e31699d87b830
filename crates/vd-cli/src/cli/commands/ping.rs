//! `vd ping` – version handshake with the verifier.

use anyhow::{Context, Result};
use vd_core::config::VdConfig;

use crate::cli::host;

pub async fn run_ping(cfg: &VdConfig) -> Result<()> {
    let version = host::verifier(cfg)
        .version()
        .await
        .with_context(|| format!("verifier {} did not answer", cfg.verifier.program))?;
    println!("{} {}", cfg.verifier.program, version);
    Ok(())
}
