//! Local download manager: plain curl GETs into a download directory.
//!
//! Stands in for a browser's download manager when vd runs from the command
//! line. Every download is announced with `HostEvent::Created` and finishes
//! with exactly one `HostEvent::Changed` (complete or interrupted).

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use super::{DownloadChange, DownloadControl, DownloadDescriptor, DownloadId, DownloadManager, HostEvent};
use crate::error::{Result, VdError};
use crate::url_model;

/// Local view of a download's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    InProgress,
    Complete,
    Interrupted,
}

#[derive(Debug, Clone)]
struct LocalItem {
    descriptor: DownloadDescriptor,
    state: LocalState,
}

type Items = Arc<Mutex<HashMap<DownloadId, LocalItem>>>;

pub struct LocalDownloads {
    dir: PathBuf,
    marker: String,
    next_id: AtomicI64,
    items: Items,
    control: Arc<DownloadControl>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl LocalDownloads {
    /// Create a manager saving into `dir`. Downloads started through
    /// `DownloadManager::start_download` carry `marker` as their extension id.
    pub fn new(
        dir: impl Into<PathBuf>,
        marker: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            dir: dir.into(),
            marker: marker.into(),
            next_id: AtomicI64::new(1),
            items: Arc::new(Mutex::new(HashMap::new())),
            control: Arc::new(DownloadControl::new()),
            events: tx,
        };
        (manager, rx)
    }

    pub fn download_dir(&self) -> &Path {
        &self.dir
    }

    /// Start a download on behalf of the user (no extension marker).
    pub fn user_download(&self, url: &Url) -> Result<DownloadId> {
        self.begin(url, None)
    }

    /// Number of downloads still transferring.
    pub fn active_count(&self) -> usize {
        lock(&self.items)
            .values()
            .filter(|item| item.state == LocalState::InProgress)
            .count()
    }

    pub fn state(&self, id: DownloadId) -> Option<LocalState> {
        lock(&self.items).get(&id).map(|item| item.state)
    }

    fn begin(&self, url: &Url, by_extension_id: Option<String>) -> Result<DownloadId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = url_model::derive_filename(url.as_str());
        let (path, file) = reserve_path(&self.dir, &name).map_err(|e| VdError::DownloadStart {
            url: url.to_string(),
            reason: format!("{e:#}"),
        })?;

        let descriptor = DownloadDescriptor {
            id,
            url: url.to_string(),
            filename: path.to_string_lossy().into_owned(),
            by_extension_id,
        };
        lock(&self.items).insert(
            id,
            LocalItem {
                descriptor: descriptor.clone(),
                state: LocalState::InProgress,
            },
        );
        if self.events.send(HostEvent::Created(descriptor)).is_err() {
            tracing::debug!("download {} created with no event listener", id);
        }

        let token = self.control.register(id);
        let control = Arc::clone(&self.control);
        let items = Arc::clone(&self.items);
        let events = self.events.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || {
            let outcome = transfer(&url, file, &token);
            control.unregister(id);
            let change = match outcome {
                Ok(bytes) => {
                    tracing::debug!("download {} finished: {} bytes from {}", id, bytes, url);
                    DownloadChange::Complete
                }
                Err(e) => {
                    tracing::info!("download {} interrupted: {:#}", id, e);
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::debug!("could not remove partial {}: {}", path.display(), e);
                    }
                    DownloadChange::Interrupted
                }
            };
            // State and event change together so `active_count() == 0` implies
            // the event is already queued.
            let mut guard = lock(&items);
            if let Some(item) = guard.get_mut(&id) {
                item.state = match change {
                    DownloadChange::Complete => LocalState::Complete,
                    DownloadChange::Interrupted => LocalState::Interrupted,
                };
            }
            if events.send(HostEvent::Changed { id, state: change }).is_err() {
                tracing::debug!("download {} changed with no event listener", id);
            }
            drop(guard);
        });

        Ok(id)
    }
}

#[async_trait]
impl DownloadManager for LocalDownloads {
    async fn start_download(&self, url: &Url) -> Result<DownloadId> {
        self.begin(url, Some(self.marker.clone()))
    }

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadDescriptor>> {
        Ok(lock(&self.items).get(&id).map(|item| item.descriptor.clone()))
    }

    async fn cancel(&self, id: DownloadId) -> Result<()> {
        if self.control.request_abort(id) {
            Ok(())
        } else {
            Err(VdError::Host(format!("download {id} is not in progress")))
        }
    }

    async fn remove_file(&self, id: DownloadId) -> Result<()> {
        let path = lock(&self.items)
            .get(&id)
            .map(|item| item.descriptor.filename.clone())
            .ok_or(VdError::UnknownDownload(id))?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| VdError::Host(format!("remove {path}: {e}")))
    }

    async fn erase(&self, id: DownloadId) -> Result<()> {
        match lock(&self.items).remove(&id) {
            Some(_) => Ok(()),
            None => Err(VdError::UnknownDownload(id)),
        }
    }
}

fn lock(items: &Items) -> std::sync::MutexGuard<'_, HashMap<DownloadId, LocalItem>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create `dir/name`, or `dir/stem(n).ext` when the name is taken.
fn reserve_path(dir: &Path, name: &str) -> AnyResult<(PathBuf, File)> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    for n in 0..1000u32 {
        let candidate = if n == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}({n}){ext}"))
        };
        match File::options().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("create {}", candidate.display()));
            }
        }
    }
    anyhow::bail!("no free file name for {} in {}", name, dir.display())
}

/// Single GET of `url` into `file`. Stops when `abort` is set.
fn transfer(url: &str, mut file: File, abort: &AtomicBool) -> AnyResult<u64> {
    let mut written = 0u64;
    let mut write_failed = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                write_failed = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.progress_function(|_, _, _, _| !abort.load(Ordering::Relaxed))?;
        transfer.perform()
    };
    if let Some(e) = write_failed {
        return Err(e).context("write download file");
    }
    match performed {
        Err(e) if e.is_aborted_by_callback() => anyhow::bail!("cancelled"),
        other => other.context("GET request failed")?,
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    file.flush().context("flush download file")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_path_appends_counter_when_taken() {
        let dir = tempfile::tempdir().unwrap();
        let (first, _) = reserve_path(dir.path(), "f.ext").unwrap();
        let (second, _) = reserve_path(dir.path(), "f.ext").unwrap();
        let (plain, _) = reserve_path(dir.path(), "SHA256SUMS").unwrap();
        let (plain2, _) = reserve_path(dir.path(), "SHA256SUMS").unwrap();
        assert_eq!(first, dir.path().join("f.ext"));
        assert_eq!(second, dir.path().join("f(1).ext"));
        assert_eq!(plain, dir.path().join("SHA256SUMS"));
        assert_eq!(plain2, dir.path().join("SHA256SUMS(1)"));
    }

    #[tokio::test]
    async fn unreachable_url_is_interrupted_and_announced() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, mut events) = LocalDownloads::new(dir.path(), "vd");
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/missing.iso")).unwrap();
        let id = manager.start_download(&url).await.unwrap();

        match events.recv().await.unwrap() {
            HostEvent::Created(d) => {
                assert_eq!(d.id, id);
                assert_eq!(d.by_extension_id.as_deref(), Some("vd"));
                assert!(d.filename.ends_with("missing.iso"));
            }
            other => panic!("expected Created, got {other:?}"),
        }
        assert_eq!(
            events.recv().await.unwrap(),
            HostEvent::Changed {
                id,
                state: DownloadChange::Interrupted
            }
        );
        assert_eq!(manager.state(id), Some(LocalState::Interrupted));
        assert_eq!(manager.active_count(), 0);
        assert!(manager.erase(id).await.is_ok());
        assert!(manager.search(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transfer_settles_without_event_listener() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, events) = LocalDownloads::new(dir.path(), "vd");
        drop(events);
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/gone.iso")).unwrap();
        let id = manager.start_download(&url).await.unwrap();

        for _ in 0..200 {
            if manager.active_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.state(id), Some(LocalState::Interrupted));
    }
}
