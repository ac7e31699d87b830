//! `vd get` – download a file with local downloads standing in for the
//! browser, and verify it once its companion is in.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;
use vd_core::config::VdConfig;
use vd_core::controller::DEFAULT_SELF_MARKER;
use vd_core::fetch::CurlFetcher;
use vd_core::host::{DownloadManager, HostEvent, LocalDownloads, LocalState};
use vd_core::{Collaborators, Controller, ControllerOptions};

use crate::cli::host::{self, ConsoleNotifier, LoggedMenus};

const IDLE_POLL: Duration = Duration::from_millis(100);

pub async fn run_get(cfg: &VdConfig, url: &str, digest: Option<&str>, dir: &Path) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("invalid URL {url}"))?;
    let (downloads, mut events) = LocalDownloads::new(dir, DEFAULT_SELF_MARKER);
    let downloads = Arc::new(downloads);
    let controller = Controller::new(
        ControllerOptions::from_config(cfg, DEFAULT_SELF_MARKER),
        Collaborators {
            downloads: downloads.clone(),
            notifier: Arc::new(ConsoleNotifier),
            menus: Arc::new(LoggedMenus),
            fetcher: Arc::new(CurlFetcher::new()),
            settings: Arc::new(cfg.clone()),
            verifier: host::verifier(cfg),
        },
    );

    let primary = downloads.user_download(&url)?;
    tracing::info!("download {} started for {}", primary, url);

    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            Some(event) = events.recv() => match (event, digest) {
                // a digest given on the command line replaces discovery
                (HostEvent::Created(download), Some(hex)) if download.id == primary => {
                    controller.register_download(&download).await;
                    if !controller.assign_digest(primary, hex).await? {
                        downloads.cancel(primary).await.ok();
                        anyhow::bail!("{hex} is not a valid digest");
                    }
                }
                (event, _) => controller.accept(event, &mut tasks).await,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("event task panicked: {}", e);
                }
            }
            _ = tokio::time::sleep(IDLE_POLL) => {
                if !tasks.is_empty() || downloads.active_count() > 0 {
                    continue;
                }
                // finished transfers queue their event before they stop counting as active
                match events.try_recv() {
                    Ok(event) => controller.accept(event, &mut tasks).await,
                    Err(_) => break,
                }
            }
        }
    }

    if downloads.state(primary) == Some(LocalState::Interrupted) {
        anyhow::bail!("download of {} failed", url);
    }
    let saved = downloads
        .search(primary)
        .await?
        .map(|d| d.filename)
        .unwrap_or_else(|| url.to_string());
    if controller.registry().await.has_primary(primary) {
        println!("No digest or signature found; {saved} was not verified.");
    }
    Ok(())
}
