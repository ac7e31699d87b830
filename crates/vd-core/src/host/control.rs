//! Cancellation for in-flight local downloads: shared abort tokens.
//!
//! Each running transfer is registered with an abort token. `cancel` sets the
//! token and the transfer's progress callback stops the download.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::DownloadId;

/// Shared registry of download id -> abort token.
#[derive(Debug, Default)]
pub struct DownloadControl {
    tokens: RwLock<HashMap<DownloadId, Arc<AtomicBool>>>,
}

impl DownloadControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transfer; returns the token its progress callback should watch.
    pub fn register(&self, id: DownloadId) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&token));
        token
    }

    /// Unregister a transfer (call when it finishes, success or failure).
    pub fn unregister(&self, id: DownloadId) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Request abort for a transfer. Returns false if nothing is running under `id`.
    pub fn request_abort(&self, id: DownloadId) -> bool {
        match self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, id: DownloadId) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_sets_registered_token() {
        let control = DownloadControl::new();
        let token = control.register(7);
        assert!(control.is_running(7));
        assert!(control.request_abort(7));
        assert!(token.load(Ordering::Relaxed));
    }

    #[test]
    fn abort_of_unknown_download_is_reported() {
        let control = DownloadControl::new();
        assert!(!control.request_abort(3));
        control.register(3);
        control.unregister(3);
        assert!(!control.request_abort(3));
        assert!(!control.is_running(3));
    }
}
