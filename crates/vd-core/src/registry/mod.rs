//! Bounded registry of tracked downloads.
//!
//! Records are kept in creation order. When more than `capacity` records
//! exist the oldest are dropped and the eviction callback is told their
//! primary ids. Eviction only forgets the record: downloads it started keep
//! running.
//!
//! Primary, digest and signature ids come from one id space, so a lookup by
//! "any id" finds at most one record.

mod record;


use std::collections::VecDeque;
use std::fmt;

use crate::error::{Result, VdError};
use crate::host::{DownloadChange, DownloadDescriptor, DownloadId};
use crate::verifier::SignedData;

pub use record::{
    is_digest_string, CompanionFile, DigestSource, PairingRecord, SignatureSource, Slot,
    SlotState, TransientDownload,
};

/// How many state changes of not-yet-attached downloads are remembered.
const EARLY_CHANGES: usize = 32;

/// Called with the primary id of every evicted record.
pub type EvictionCallback = Box<dyn Fn(DownloadId) + Send + Sync>;

/// Outcome of attaching a companion download to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attached {
    /// Earlier companion of the same kind that is no longer needed.
    pub replaced: Option<TransientDownload>,
    /// State change the host reported for the companion before it was attached.
    pub early: Option<DownloadChange>,
}

pub struct PairRegistry {
    capacity: usize,
    records: VecDeque<PairingRecord>,
    on_evict: Option<EvictionCallback>,
    early: VecDeque<(DownloadId, DownloadChange)>,
}

impl PairRegistry {
    /// A registry holding at most `capacity` records (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: VecDeque::new(),
            on_evict: None,
            early: VecDeque::new(),
        }
    }

    pub fn with_eviction_callback(
        mut self,
        callback: impl Fn(DownloadId) + Send + Sync + 'static,
    ) -> Self {
        self.on_evict = Some(Box::new(callback));
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Starts tracking `download` and drops the oldest records beyond capacity.
    pub fn create_entry(&mut self, download: &DownloadDescriptor) -> &PairingRecord {
        if let Some(stale) = self.remove(download.id) {
            tracing::warn!("download id {} registered twice, replacing", stale.primary_id());
        }
        self.records.push_back(PairingRecord::new(download));
        self.enforce_capacity();
        let newest = self.records.len() - 1;
        &self.records[newest]
    }

    /// Evicts the oldest records until at most `capacity` remain.
    pub fn enforce_capacity(&mut self) {
        while self.records.len() > self.capacity {
            let Some(evicted) = self.records.pop_front() else {
                break;
            };
            tracing::debug!("evicting record {}", evicted.primary_id());
            if let Some(callback) = &self.on_evict {
                callback(evicted.primary_id());
            }
        }
    }

    pub fn get(&self, primary: DownloadId) -> Option<&PairingRecord> {
        self.records.iter().find(|r| r.primary_id() == primary)
    }

    pub fn get_mut(&mut self, primary: DownloadId) -> Option<&mut PairingRecord> {
        self.records.iter_mut().find(|r| r.primary_id() == primary)
    }

    pub fn by_digest(&self, id: DownloadId) -> Option<&PairingRecord> {
        self.records.iter().find(|r| r.digest_id() == Some(id))
    }

    pub fn by_signature(&self, id: DownloadId) -> Option<&PairingRecord> {
        self.records.iter().find(|r| r.signature_id() == Some(id))
    }

    pub fn by_any_id(&self, id: DownloadId) -> Option<&PairingRecord> {
        self.records.iter().find(|r| r.slot_of(id).is_some())
    }

    pub fn by_any_id_mut(&mut self, id: DownloadId) -> Option<&mut PairingRecord> {
        self.records.iter_mut().find(|r| r.slot_of(id).is_some())
    }

    pub fn has_primary(&self, id: DownloadId) -> bool {
        self.get(id).is_some()
    }

    pub fn has_digest(&self, id: DownloadId) -> bool {
        self.by_digest(id).is_some()
    }

    pub fn has_signature(&self, id: DownloadId) -> bool {
        self.by_signature(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PairingRecord> {
        self.records.iter()
    }

    /// Stops tracking `primary`. The eviction callback is not invoked.
    pub fn remove(&mut self, primary: DownloadId) -> Option<PairingRecord> {
        let index = self.records.iter().position(|r| r.primary_id() == primary)?;
        self.records.remove(index)
    }

    /// Attaches a started digest download to the record of `primary`.
    pub fn attach_digest_file(
        &mut self,
        primary: DownloadId,
        file: CompanionFile,
    ) -> Result<Attached> {
        self.attach(primary, file, None)
    }

    /// Attaches a started signature download to the record of `primary`.
    pub fn attach_signature_file(
        &mut self,
        primary: DownloadId,
        file: CompanionFile,
        signed_data: SignedData,
    ) -> Result<Attached> {
        self.attach(primary, file, Some(signed_data))
    }

    fn attach(
        &mut self,
        primary: DownloadId,
        file: CompanionFile,
        signature: Option<SignedData>,
    ) -> Result<Attached> {
        if let Some(owner) = self.by_any_id(file.id) {
            return Err(VdError::IdReused {
                id: file.id,
                owner: owner.primary_id(),
            });
        }
        let early = self.take_early(file.id);
        let record = self
            .get_mut(primary)
            .ok_or(VdError::UnknownDownload(primary))?;
        let id = file.id;
        let replaced = match signature {
            Some(signed_data) => record.set_signature_file(file, signed_data),
            None => record.set_digest_file(file),
        };
        match early {
            Some(DownloadChange::Complete) => {
                record.mark_downloaded(id)?;
            }
            Some(DownloadChange::Interrupted) => {
                record.mark_interrupted(id)?;
            }
            None => {}
        }
        Ok(Attached { replaced, early })
    }

    /// Uses a digest string pasted by the user for the record of `primary`.
    pub fn assign_digest_hex(
        &mut self,
        primary: DownloadId,
        hex: &str,
    ) -> Result<Option<TransientDownload>> {
        self.get_mut(primary)
            .ok_or(VdError::UnknownDownload(primary))?
            .set_digest_hex(hex)
    }

    /// Remembers a state change for an id no record knows yet. A companion
    /// download can finish before the task that started it attaches it.
    pub fn note_unclaimed_change(&mut self, id: DownloadId, change: DownloadChange) {
        self.early.retain(|(known, _)| *known != id);
        if self.early.len() == EARLY_CHANGES {
            self.early.pop_front();
        }
        self.early.push_back((id, change));
    }

    fn take_early(&mut self, id: DownloadId) -> Option<DownloadChange> {
        let index = self.early.iter().position(|(known, _)| *known == id)?;
        self.early.remove(index).map(|(_, change)| change)
    }
}

impl fmt::Debug for PairRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairRegistry")
            .field("capacity", &self.capacity)
            .field("records", &self.records)
            .field("on_evict", &self.on_evict.is_some())
            .field("early", &self.early)
            .finish()
    }
}
