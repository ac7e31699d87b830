//! Reacting to finished and interrupted downloads: readiness, dispatch to the
//! verifier and cleanup of companion downloads.
//!
//! A record leaves the registry when it is dispatched or torn down, so a
//! second completion event can never send the same pair twice. Only
//! companion downloads are ever cancelled or deleted; the primary file is
//! left alone.

use super::Controller;
use crate::error::{Result, VdError};
use crate::host::{DownloadChange, DownloadId};
use crate::menus;
use crate::registry::{PairRegistry, PairingRecord, SlotState, TransientDownload};
use crate::settings::Setting;
use crate::verifier::Verdict;

/// Work left after a state change was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// The record is ready; send it to the verifier.
    Dispatch(PairingRecord),
    /// A download of the record was interrupted; clean up its companions.
    Teardown(PairingRecord),
}

impl Controller {
    /// Records a state change and runs whatever it triggers.
    pub async fn handle_download_changed(
        &self,
        id: DownloadId,
        change: DownloadChange,
    ) -> Result<()> {
        match self.apply_change(id, change).await? {
            Some(follow_up) => self.follow_up(follow_up).await,
            None => Ok(()),
        }
    }

    /// Updates the registry for a state change of download `id`. A record
    /// that becomes ready or loses a download is taken out of the registry
    /// and returned with the work still to do.
    pub async fn apply_change(
        &self,
        id: DownloadId,
        change: DownloadChange,
    ) -> Result<Option<FollowUp>> {
        let mut registry = self.shared.registry.lock().await;
        if registry.by_any_id(id).is_none() {
            match change {
                DownloadChange::Complete => tracing::debug!("untracked download {} complete", id),
                DownloadChange::Interrupted => {
                    tracing::warn!("Unrecorded download ({}) interrupted", id)
                }
            }
            registry.note_unclaimed_change(id, change);
            return Ok(None);
        }
        let Some(record) = registry.by_any_id_mut(id) else {
            return Ok(None);
        };
        let primary = record.primary_id();
        match change {
            DownloadChange::Complete => {
                let slot = record.mark_downloaded(id)?;
                tracing::debug!("{:?} download {} of {} complete", slot, id, primary);
                if !record.ready_for_verification() {
                    return Ok(None);
                }
                Ok(self.forget_locked(&mut registry, primary).map(FollowUp::Dispatch))
            }
            DownloadChange::Interrupted => {
                let slot = record.mark_interrupted(id)?;
                tracing::warn!(
                    "{:?} download {} of {} interrupted, deleting entries",
                    slot,
                    id,
                    primary
                );
                Ok(self.forget_locked(&mut registry, primary).map(FollowUp::Teardown))
            }
        }
    }

    pub async fn follow_up(&self, follow_up: FollowUp) -> Result<()> {
        match follow_up {
            FollowUp::Dispatch(record) => self.dispatch(record).await.map(|_| ()),
            FollowUp::Teardown(record) => {
                self.teardown(&record).await;
                Ok(())
            }
        }
    }

    /// Dispatches the record of `primary` if it is ready.
    pub async fn dispatch_if_ready(&self, primary: DownloadId) -> Result<Option<Verdict>> {
        let claimed = {
            let mut registry = self.shared.registry.lock().await;
            match registry.get(primary) {
                Some(record) if record.ready_for_verification() => {
                    self.forget_locked(&mut registry, primary)
                }
                _ => None,
            }
        };
        match claimed {
            Some(record) => self.dispatch(record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Sends a claimed record to the verifier, reports the verdict and cleans
    /// up the companion downloads whatever the outcome.
    pub async fn dispatch(&self, record: PairingRecord) -> Result<Verdict> {
        let outcome = match record.serialize() {
            Ok(request) => self.collab().verifier.verify(&request).await,
            Err(e) => Err(e),
        };
        self.teardown(&record).await;
        match outcome {
            Ok(report) => {
                tracing::info!("{} verified: {}", record.primary_path(), report.verdict);
                self.notify_if(report.verdict.notify_setting(), report.title(), &report.message)
                    .await;
                Ok(report.verdict)
            }
            Err(e) => {
                tracing::error!("verification of {} failed: {}", record.primary_path(), e);
                if e.notify_user() {
                    self.notify_if(Setting::NotifyOnError, "Error encountered", &e.to_string())
                        .await;
                }
                Err(e)
            }
        }
    }

    /// Error path of discovery: drop the record, clean up, tell the user if worth it.
    pub(crate) async fn abandon(&self, primary: DownloadId, err: &VdError) {
        if err.is_stale_record() {
            tracing::debug!("{}", err);
        } else {
            tracing::error!("{}", err);
        }
        let record = {
            let mut registry = self.shared.registry.lock().await;
            self.forget_locked(&mut registry, primary)
        };
        if let Some(record) = record {
            self.teardown(&record).await;
        }
        if err.notify_user() {
            self.notify_if(Setting::NotifyOnError, "Error encountered", &err.to_string())
                .await;
        }
    }

    async fn teardown(&self, record: &PairingRecord) {
        for companion in record.companions() {
            self.cleanup(companion).await;
        }
    }

    /// Cancels a running companion download or deletes its file, then erases
    /// it from the host's history. Failures are only logged.
    pub(crate) async fn cleanup(&self, download: TransientDownload) {
        let downloads = &self.collab().downloads;
        let id = download.id;
        match download.state {
            SlotState::Downloaded => {
                if let Err(e) = downloads.remove_file(id).await {
                    tracing::warn!("Unable to remove file of download {}: {}", id, e);
                }
            }
            SlotState::Downloading | SlotState::Unknown => {
                if let Err(e) = downloads.cancel(id).await {
                    tracing::warn!("Unable to cancel download {}: {}", id, e);
                    // it may have finished in the meantime
                    if downloads.remove_file(id).await.is_ok() {
                        tracing::debug!("removed file of finished download {}", id);
                    }
                }
            }
            SlotState::Interrupted | SlotState::AssignedManually => {}
        }
        if let Err(e) = downloads.erase(id).await {
            tracing::warn!("Unable to remove download {} from history: {}", id, e);
        }
    }

    /// Removes the record of `primary` with its menu entries; the menu
    /// parents go when the last record does.
    fn forget_locked(
        &self,
        registry: &mut PairRegistry,
        primary: DownloadId,
    ) -> Option<PairingRecord> {
        let record = registry.remove(primary)?;
        let surface = &self.collab().menus;
        for child in menus::child_ids(primary) {
            surface.remove(&child);
        }
        if registry.is_empty() {
            for kind in menus::MenuKind::ALL {
                surface.remove(&kind.parent_id());
            }
        }
        Some(record)
    }
}
