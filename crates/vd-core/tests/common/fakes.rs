//! In-memory collaborators for driving the controller in tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use vd_core::config::VdConfig;
use vd_core::fetch::DirectoryFetcher;
use vd_core::host::{DownloadDescriptor, DownloadId, DownloadManager, MenuSurface, Notifier};
use vd_core::menus::MenuItem;
use vd_core::verifier::{VerifierBridge, VerifierTransport};
use vd_core::{Collaborators, Controller, ControllerOptions, Result, VdError};

/// First id handed out by `FakeDownloads`.
pub const FIRST_COMPANION_ID: DownloadId = 100;

pub const SHA256: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

/// Primary download as the host would announce it.
pub fn primary(id: DownloadId, url: &str) -> DownloadDescriptor {
    let name = url.rsplit('/').next().unwrap_or("download.bin");
    DownloadDescriptor {
        id,
        url: url.to_string(),
        filename: format!("/home/u/Downloads/{name}"),
        by_extension_id: None,
    }
}

pub fn integrity_pass() -> Value {
    json!({"integrity": {"Ok": "PASS"}, "signatures": {"Ok": []}})
}

/// Host download manager that never transfers anything.
#[derive(Default)]
pub struct FakeDownloads {
    next_id: AtomicI64,
    items: Mutex<HashMap<DownloadId, DownloadDescriptor>>,
    refused: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeDownloads {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(FIRST_COMPANION_ID),
            ..Self::default()
        }
    }

    /// `start_download` of `url` will fail.
    pub fn refuse(&self, url: &str) {
        self.refused.lock().unwrap().insert(url.to_string());
    }

    /// URLs started so far, in order.
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    /// Every call as `"<op> <arg>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DownloadManager for FakeDownloads {
    async fn start_download(&self, url: &Url) -> Result<DownloadId> {
        self.log(format!("start {url}"));
        if self.refused.lock().unwrap().contains(url.as_str()) {
            return Err(VdError::DownloadStart {
                url: url.to_string(),
                reason: "forbidden".to_string(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = url.path_segments().and_then(|s| s.last()).unwrap_or("x");
        self.items.lock().unwrap().insert(
            id,
            DownloadDescriptor {
                id,
                url: url.to_string(),
                filename: format!("/home/u/Downloads/{name}"),
                by_extension_id: Some("vd@vd.io".to_string()),
            },
        );
        Ok(id)
    }

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadDescriptor>> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    async fn cancel(&self, id: DownloadId) -> Result<()> {
        self.log(format!("cancel {id}"));
        Ok(())
    }

    async fn remove_file(&self, id: DownloadId) -> Result<()> {
        self.log(format!("remove {id}"));
        Ok(())
    }

    async fn erase(&self, id: DownloadId) -> Result<()> {
        self.log(format!("erase {id}"));
        self.items.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, message: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingMenus {
    live: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
}

impl RecordingMenus {
    /// Ids created and not yet removed.
    pub fn live(&self) -> Vec<String> {
        self.live.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

impl MenuSurface for RecordingMenus {
    fn create(&self, item: &MenuItem) {
        self.live.lock().unwrap().push(item.id.clone());
    }

    fn remove(&self, id: &str) {
        self.live.lock().unwrap().retain(|live| live != id);
        self.removed.lock().unwrap().push(id.to_string());
    }
}

/// Verifier answering every request with the same reply (or failing).
pub struct ScriptedVerifier {
    reply: Option<Value>,
    seen: Mutex<Vec<Value>>,
    digest_contents: Mutex<Vec<String>>,
}

impl ScriptedVerifier {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply: Some(reply),
            seen: Mutex::new(Vec::new()),
            digest_contents: Mutex::new(Vec::new()),
        }
    }

    /// A verifier that cannot be reached.
    pub fn broken() -> Self {
        Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
            digest_contents: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }

    /// Contents of every `digest-file` at the time it was sent.
    pub fn digest_contents(&self) -> Vec<String> {
        self.digest_contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerifierTransport for ScriptedVerifier {
    async fn exchange(&self, message: Value) -> Result<Value> {
        if let Some(path) = message.get("digest-file").and_then(Value::as_str) {
            if let Ok(contents) = std::fs::read_to_string(path) {
                self.digest_contents.lock().unwrap().push(contents);
            }
        }
        self.seen.lock().unwrap().push(message);
        self.reply
            .clone()
            .ok_or_else(|| VdError::Verifier("broken pipe".to_string()))
    }
}

/// Directory fetcher serving canned pages.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    pending: bool,
}

impl StaticFetcher {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Every fetch hangs forever.
    pub fn hanging() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DirectoryFetcher for StaticFetcher {
    async fn get_text(&self, url: &Url) -> Result<String> {
        if self.pending {
            std::future::pending::<()>().await;
        }
        self.pages.get(url.as_str()).cloned().ok_or_else(|| VdError::Fetch {
            url: url.to_string(),
            reason: "Not Found".to_string(),
        })
    }
}

/// Controller wired to fakes.
pub struct Harness {
    pub controller: Controller,
    pub downloads: Arc<FakeDownloads>,
    pub notifier: Arc<RecordingNotifier>,
    pub menus: Arc<RecordingMenus>,
    pub verifier: Arc<ScriptedVerifier>,
}

impl Harness {
    pub fn new(config: VdConfig, fetcher: StaticFetcher, verifier: ScriptedVerifier) -> Self {
        let options = ControllerOptions::from_config(&config, "vd@vd.io");
        Self::with_options(config, options, fetcher, verifier)
    }

    pub fn with_options(
        config: VdConfig,
        options: ControllerOptions,
        fetcher: StaticFetcher,
        verifier: ScriptedVerifier,
    ) -> Self {
        let downloads = Arc::new(FakeDownloads::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let menus = Arc::new(RecordingMenus::default());
        let verifier = Arc::new(verifier);
        let controller = Controller::new(
            options,
            Collaborators {
                downloads: downloads.clone(),
                notifier: notifier.clone(),
                menus: menus.clone(),
                fetcher: Arc::new(fetcher),
                settings: Arc::new(config),
                verifier: VerifierBridge::new(verifier.clone()),
            },
        );
        Self {
            controller,
            downloads,
            notifier,
            menus,
            verifier,
        }
    }
}
