//! Top-level controller: owns the pair registry and wires the discovery and
//! lifecycle handlers to the host's download events.
//!
//! Registry updates for one event happen before the next event is looked
//! at; the slow continuations (fetching listings, starting companion
//! downloads, talking to the verifier) run as separate tasks.

mod discovery;
mod lifecycle;
mod manual;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::task::JoinSet;

use crate::config::VdConfig;
use crate::fetch::DirectoryFetcher;
use crate::host::{DownloadDescriptor, DownloadManager, HostEvent, MenuSurface, Notifier};
use crate::listing::DigestProfile;
use crate::menus;
use crate::registry::PairRegistry;
use crate::settings::{Setting, SettingsProvider};
use crate::verifier::VerifierBridge;

pub use discovery::{DiscoveryOutcome, Strategy};
pub use lifecycle::FollowUp;

/// Marker the host puts on downloads vd starts itself.
pub const DEFAULT_SELF_MARKER: &str = "vd@vd.io";

/// Which companion kind discovery tries first, for rules and autodetection alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    pub signature_first: bool,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            signature_first: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Registry capacity.
    pub capacity: usize,
    /// `by_extension_id` of downloads started by vd; such downloads are never tracked as primaries.
    pub self_marker: String,
    /// When false, signatures are neither looked up nor detected.
    pub signatures_supported: bool,
    pub digest_profile: DigestProfile,
    pub policy: DiscoveryPolicy,
    pub fetch_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            capacity: 10,
            self_marker: DEFAULT_SELF_MARKER.to_string(),
            signatures_supported: true,
            digest_profile: DigestProfile::default(),
            policy: DiscoveryPolicy::default(),
            fetch_timeout: Duration::from_millis(2000),
        }
    }
}

impl ControllerOptions {
    pub fn from_config(config: &VdConfig, self_marker: impl Into<String>) -> Self {
        Self {
            capacity: config.remember_downloads,
            self_marker: self_marker.into(),
            signatures_supported: config.signatures_supported,
            digest_profile: config.digest_profile(),
            policy: DiscoveryPolicy::default(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// Everything the controller drives but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub downloads: Arc<dyn DownloadManager>,
    pub notifier: Arc<dyn Notifier>,
    pub menus: Arc<dyn MenuSurface>,
    pub fetcher: Arc<dyn DirectoryFetcher>,
    pub settings: Arc<dyn SettingsProvider>,
    pub verifier: VerifierBridge,
}

struct Shared {
    registry: Mutex<PairRegistry>,
    options: ControllerOptions,
    collab: Collaborators,
}

/// Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    pub fn new(options: ControllerOptions, collab: Collaborators) -> Self {
        let surface = Arc::clone(&collab.menus);
        let registry = PairRegistry::new(options.capacity).with_eviction_callback(move |id| {
            for child in menus::child_ids(id) {
                surface.remove(&child);
            }
        });
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(registry),
                options,
                collab,
            }),
        }
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.shared.options
    }

    /// Locked registry, for inspection.
    pub async fn registry(&self) -> MutexGuard<'_, PairRegistry> {
        self.shared.registry.lock().await
    }

    fn collab(&self) -> &Collaborators {
        &self.shared.collab
    }

    fn settings(&self) -> &dyn SettingsProvider {
        self.shared.collab.settings.as_ref()
    }

    /// Notifies unless the user switched off notifications for `setting`.
    async fn notify_if(&self, setting: Setting, title: &str, message: &str) {
        if self.settings().flag(setting, true) {
            self.collab().notifier.notify(title, message).await;
        } else {
            tracing::debug!("notification for {} suppressed: {}", setting, message);
        }
    }

    /// Handles one host event. Registry bookkeeping happens before this
    /// returns; the rest is spawned onto `tasks`.
    pub async fn accept(&self, event: HostEvent, tasks: &mut JoinSet<()>) {
        match event {
            HostEvent::Created(download) => {
                if !self.register_download(&download).await {
                    return;
                }
                let this = self.clone();
                tasks.spawn(async move {
                    if let Err(e) = this.discover(&download).await {
                        tracing::error!("discovery for {} failed: {}", download.url, e);
                    }
                });
            }
            HostEvent::Changed { id, state } => {
                let follow_up = match self.apply_change(id, state).await {
                    Ok(Some(follow_up)) => follow_up,
                    Ok(None) => return,
                    Err(e) => {
                        tracing::error!("download {} {}: {}", id, state.as_str(), e);
                        return;
                    }
                };
                let this = self.clone();
                tasks.spawn(async move {
                    if let Err(e) = this.follow_up(follow_up).await {
                        tracing::error!("handling download {} failed: {}", id, e);
                    }
                });
            }
        }
    }

    /// Processes host events until the host closes the channel, then waits
    /// for outstanding work.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<HostEvent>) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.accept(event, &mut tasks).await,
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("event task panicked: {}", e);
                    }
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("event task panicked: {}", e);
            }
        }
    }

    /// Version handshake with the verifier; tells the user when it fails.
    pub async fn check_verifier(&self) -> crate::error::Result<String> {
        match self.collab().verifier.version().await {
            Ok(version) => {
                tracing::info!("verifier version {}", version);
                Ok(version)
            }
            Err(e) => {
                tracing::error!("verifier handshake failed: {}", e);
                self.notify_if(
                    Setting::NotifyOnError,
                    "Error encountered",
                    "vd-verifier is not working correctly. Please ensure it is installed and up to date.",
                )
                .await;
                Err(e)
            }
        }
    }

    pub(crate) fn should_be_ignored(&self, download: &DownloadDescriptor) -> bool {
        download.by_extension_id.as_deref() == Some(self.shared.options.self_marker.as_str())
    }
}
