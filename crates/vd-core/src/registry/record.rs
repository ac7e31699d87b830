//! One tracked download and the companion material found for it.

use crate::error::{Result, VdError};
use crate::host::{DownloadDescriptor, DownloadId};
use crate::url_model;
use crate::verifier::{SignedData, VerifierRequest};

/// Hex digests accepted from the user: 20 to 64 bytes.
const DIGEST_HEX_LEN: std::ops::RangeInclusive<usize> = 40..=128;

/// Progress of one slot (primary, digest or signature) of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Unknown,
    Downloading,
    Downloaded,
    Interrupted,
    /// Digest pasted by the user instead of downloaded.
    AssignedManually,
}

/// Which slot of a record an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Digest,
    Signature,
}

/// A companion file downloaded by vd itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionFile {
    pub id: DownloadId,
    /// Absolute path on disk, as reported by the host.
    pub path: String,
}

impl From<&DownloadDescriptor> for CompanionFile {
    fn from(d: &DownloadDescriptor) -> Self {
        Self {
            id: d.id,
            path: d.filename.clone(),
        }
    }
}

/// Where the digest for a record comes from. Only one source at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestSource {
    File(CompanionFile),
    Direct(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSource {
    pub file: CompanionFile,
    pub signed_data: SignedData,
}

/// A companion download that has to be cleaned up once the record is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientDownload {
    pub id: DownloadId,
    pub state: SlotState,
}

/// True for an even-length hex string of 40 to 128 characters.
pub fn is_digest_string(s: &str) -> bool {
    s.len() % 2 == 0 && DIGEST_HEX_LEN.contains(&s.len()) && hex::decode(s).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRecord {
    primary_id: DownloadId,
    primary_path: String,
    original_filename: String,
    primary_state: SlotState,
    digest: Option<DigestSource>,
    digest_state: SlotState,
    signature: Option<SignatureSource>,
    signature_state: SlotState,
}

impl PairingRecord {
    pub fn new(download: &DownloadDescriptor) -> Self {
        Self {
            primary_id: download.id,
            primary_path: download.filename.clone(),
            original_filename: url_model::original_filename(&download.url),
            primary_state: SlotState::Downloading,
            digest: None,
            digest_state: SlotState::Unknown,
            signature: None,
            signature_state: SlotState::Unknown,
        }
    }

    pub fn primary_id(&self) -> DownloadId {
        self.primary_id
    }

    pub fn primary_path(&self) -> &str {
        &self.primary_path
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn primary_state(&self) -> SlotState {
        self.primary_state
    }

    pub fn digest(&self) -> Option<&DigestSource> {
        self.digest.as_ref()
    }

    pub fn digest_state(&self) -> SlotState {
        self.digest_state
    }

    pub fn digest_id(&self) -> Option<DownloadId> {
        match &self.digest {
            Some(DigestSource::File(file)) => Some(file.id),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&SignatureSource> {
        self.signature.as_ref()
    }

    pub fn signature_state(&self) -> SlotState {
        self.signature_state
    }

    pub fn signature_id(&self) -> Option<DownloadId> {
        self.signature.as_ref().map(|s| s.file.id)
    }

    /// Slot that `id` occupies in this record, if any.
    pub fn slot_of(&self, id: DownloadId) -> Option<Slot> {
        if id == self.primary_id {
            Some(Slot::Primary)
        } else if self.digest_id() == Some(id) {
            Some(Slot::Digest)
        } else if self.signature_id() == Some(id) {
            Some(Slot::Signature)
        } else {
            None
        }
    }

    /// Marks the download `id` as finished. `id` must belong to this record.
    pub fn mark_downloaded(&mut self, id: DownloadId) -> Result<Slot> {
        self.mark(id, SlotState::Downloaded)
    }

    pub fn mark_interrupted(&mut self, id: DownloadId) -> Result<Slot> {
        self.mark(id, SlotState::Interrupted)
    }

    fn mark(&mut self, id: DownloadId, state: SlotState) -> Result<Slot> {
        let slot = self.slot_of(id).ok_or_else(|| VdError::UnknownSlot {
            id,
            primary: self.primary_id,
            input_file: self.primary_path.clone(),
        })?;
        match slot {
            Slot::Primary => self.primary_state = state,
            Slot::Digest => self.digest_state = state,
            Slot::Signature => self.signature_state = state,
        }
        Ok(slot)
    }

    /// Primary downloaded and at least one of: digest downloaded, digest
    /// assigned manually, signature downloaded.
    pub fn ready_for_verification(&self) -> bool {
        self.primary_state == SlotState::Downloaded
            && (self.digest_state == SlotState::Downloaded
                || self.digest_state == SlotState::AssignedManually
                || self.signature_state == SlotState::Downloaded)
    }

    /// Uses `hex` (trimmed) as the digest, replacing any digest file.
    /// Returns the replaced digest download, which is no longer needed.
    pub fn set_digest_hex(&mut self, hex: &str) -> Result<Option<TransientDownload>> {
        let hex = hex.trim();
        if !is_digest_string(hex) {
            return Err(VdError::InvalidDigest(hex.to_string()));
        }
        let replaced = self.digest_transient();
        self.digest = Some(DigestSource::Direct(hex.to_string()));
        self.digest_state = SlotState::AssignedManually;
        Ok(replaced)
    }

    /// Attaches a freshly started digest download, replacing any earlier digest.
    pub fn set_digest_file(&mut self, file: CompanionFile) -> Option<TransientDownload> {
        let replaced = self.digest_transient();
        self.digest = Some(DigestSource::File(file));
        self.digest_state = SlotState::Downloading;
        replaced
    }

    /// Attaches a freshly started signature download, replacing any earlier one.
    pub fn set_signature_file(
        &mut self,
        file: CompanionFile,
        signed_data: SignedData,
    ) -> Option<TransientDownload> {
        let replaced = self.signature_transient();
        self.signature = Some(SignatureSource { file, signed_data });
        self.signature_state = SlotState::Downloading;
        replaced
    }

    /// Companion downloads that vd started for this record.
    pub fn companions(&self) -> Vec<TransientDownload> {
        self.digest_transient()
            .into_iter()
            .chain(self.signature_transient())
            .collect()
    }

    fn digest_transient(&self) -> Option<TransientDownload> {
        self.digest_id().map(|id| TransientDownload {
            id,
            state: self.digest_state,
        })
    }

    fn signature_transient(&self) -> Option<TransientDownload> {
        self.signature_id().map(|id| TransientDownload {
            id,
            state: self.signature_state,
        })
    }

    /// Request for the verifier. Fails when the record carries neither a
    /// digest nor a signature.
    pub fn serialize(&self) -> Result<VerifierRequest> {
        let mut request = VerifierRequest {
            original_filename: self.original_filename.clone(),
            input_file: self.primary_path.clone(),
            digest_file: None,
            digest_direct: None,
            signature_file: None,
            signed_data: None,
        };
        match &self.digest {
            Some(DigestSource::File(file)) => request.digest_file = Some(file.path.clone()),
            Some(DigestSource::Direct(hex)) => request.digest_direct = Some(hex.clone()),
            None => {}
        }
        if let Some(signature) = &self.signature {
            request.signature_file = Some(signature.file.path.clone());
            request.signed_data = Some(signature.signed_data);
        }
        if self.digest.is_none() && self.signature.is_none() {
            return Err(VdError::Unfit(format!(
                "{} ({}) has no digest or signature",
                self.primary_path, self.primary_id
            )));
        }
        Ok(request)
    }
}
