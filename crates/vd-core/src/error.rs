//! Error type shared by every core operation.
//!
//! Each variant knows whether it is worth a user-facing notification
//! (`notify_user`) or should only be logged.

use thiserror::Error;

use crate::host::DownloadId;

pub type Result<T, E = VdError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VdError {
    /// Directory listing (or other GET) failed: connection error or non-2xx status.
    #[error("failed fetch() for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Directory listing did not answer within the configured bound.
    #[error("fetch call to {url} timed out after {timeout_ms} ms")]
    FetchTimeout { url: String, timeout_ms: u64 },

    /// Host download manager refused to start a companion download.
    #[error("unable to download {url}: {reason}")]
    DownloadStart { url: String, reason: String },

    /// Any other host download-manager failure (search/cancel/remove/erase).
    #[error("download manager: {0}")]
    Host(String),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{0} is not a valid digest string")]
    InvalidDigest(String),

    #[error("invalid menu item id: {0}")]
    InvalidMenuId(String),

    #[error("menu action {0} is missing its selection or link")]
    MissingMenuTarget(String),

    #[error("no download {0} is being tracked")]
    UnknownDownload(DownloadId),

    /// The verifier answered with something that is not a recognised reply.
    #[error("invalid response from verifier: {0}")]
    Protocol(String),

    /// Spawning or talking to the verifier process failed.
    #[error("error communicating with verifier: {0}")]
    Verifier(String),

    /// An id was routed to a record that has no slot for it.
    #[error("invalid id {id} to be marked for {input_file} ({primary})")]
    UnknownSlot {
        id: DownloadId,
        primary: DownloadId,
        input_file: String,
    },

    /// A companion id is already attached to another live record.
    #[error("download {id} is already attached to record {owner}")]
    IdReused { id: DownloadId, owner: DownloadId },

    /// Serialization requested for a record without digest or signature material.
    #[error("entry unfit to be sent: {0}")]
    Unfit(String),
}

impl VdError {
    /// True when the record was already dispatched or dropped by the time the
    /// operation reached it.
    pub fn is_stale_record(&self) -> bool {
        matches!(self, VdError::UnknownDownload(_))
    }

    /// True when the error should be surfaced to the user, false for log-only errors.
    pub fn notify_user(&self) -> bool {
        match self {
            VdError::DownloadStart { .. }
            | VdError::InvalidDigest(_)
            | VdError::Protocol(_)
            | VdError::Verifier(_) => true,
            VdError::Fetch { .. }
            | VdError::FetchTimeout { .. }
            | VdError::Host(_)
            | VdError::InvalidUrl { .. }
            | VdError::InvalidMenuId(_)
            | VdError::MissingMenuTarget(_)
            | VdError::UnknownDownload(_)
            | VdError::UnknownSlot { .. }
            | VdError::IdReused { .. }
            | VdError::Unfit(_) => false,
        }
    }
}
