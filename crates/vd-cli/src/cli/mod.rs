//! CLI for vd.

mod commands;
mod host;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use vd_core::config;

use commands::{run_completions, run_get, run_match, run_ping, run_scan};

/// Top-level CLI for vd.
#[derive(Debug, Parser)]
#[command(name = "vd")]
#[command(about = "vd: download a file together with its digest or signature and verify it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file, find its digest or signature and verify it.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Use this hex digest instead of looking for a digest file.
        #[arg(long, value_name = "HEX")]
        digest: Option<String>,

        /// Directory to save into (default: current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Show what the configured rule lists map a URL to.
    Match {
        /// Download URL.
        url: String,
    },

    /// List the digest and signature candidates in a URL's directory listing.
    Scan {
        /// Download URL.
        url: String,
    },

    /// Check that the verifier answers.
    Ping,

    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get { url, digest, dir } => {
                let dir = match dir {
                    Some(dir) => dir,
                    None => std::env::current_dir()?,
                };
                run_get(&cfg, &url, digest.as_deref(), &dir).await?;
            }
            CliCommand::Match { url } => run_match(&cfg, &url)?,
            CliCommand::Scan { url } => run_scan(&cfg, &url).await?,
            CliCommand::Ping => run_ping(&cfg).await?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
