//! Host collaborators: the download manager, user notifications and the menu surface.
//!
//! The core never touches the network or the filesystem for downloads itself;
//! it drives whatever implements `DownloadManager` and reacts to the
//! `HostEvent`s that implementation emits.

mod control;
mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;
use crate::menus::MenuItem;

pub use control::DownloadControl;
pub use local::{LocalDownloads, LocalState};

/// Download identifier assigned by the host download manager.
pub type DownloadId = i64;

/// What the host knows about a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDescriptor {
    pub id: DownloadId,
    pub url: String,
    /// Absolute path of the file on disk.
    pub filename: String,
    /// Set when the download was started by an extension (or by vd itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_extension_id: Option<String>,
}

/// Terminal state transitions the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadChange {
    Complete,
    Interrupted,
}

impl DownloadChange {
    pub fn as_str(self) -> &'static str {
        match self {
            DownloadChange::Complete => "complete",
            DownloadChange::Interrupted => "interrupted",
        }
    }

    /// Parses the host's `state.current` value; any other state is not interesting.
    pub fn from_state(current: &str) -> Option<Self> {
        match current {
            "complete" => Some(DownloadChange::Complete),
            "interrupted" => Some(DownloadChange::Interrupted),
            _ => None,
        }
    }
}

/// Events delivered by the host in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Created(DownloadDescriptor),
    Changed {
        id: DownloadId,
        state: DownloadChange,
    },
}

/// Host download manager.
#[async_trait]
pub trait DownloadManager: Send + Sync {
    /// Start downloading `url` without prompting the user; returns the new id.
    async fn start_download(&self, url: &Url) -> Result<DownloadId>;

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadDescriptor>>;

    async fn cancel(&self, id: DownloadId) -> Result<()>;

    /// Delete the downloaded file from disk.
    async fn remove_file(&self, id: DownloadId) -> Result<()>;

    /// Forget the download in the host's history.
    async fn erase(&self, id: DownloadId) -> Result<()>;
}

/// User-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
}

/// Context-menu presentation layer. Calls are fire-and-forget.
pub trait MenuSurface: Send + Sync {
    fn create(&self, item: &MenuItem);

    fn remove(&self, id: &str);
}
