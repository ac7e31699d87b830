//! Finding the digest or signature of a new download.
//!
//! Rule lists first, then the directory listing next to the download. What
//! is found is downloaded by the host and attached to the record; a download
//! with nothing found stays registered so the user can designate a digest
//! through the menu.

use std::fmt;
use url::Url;

use super::Controller;
use crate::error::{Result, VdError};
use crate::fetch::bounded_fetch;
use crate::host::{DownloadChange, DownloadDescriptor, DownloadId};
use crate::listing::{
    digest_candidates, extract_same_origin_links, filter_signature_links, select_first,
};
use crate::menus;
use crate::registry::{CompanionFile, SlotState, TransientDownload};
use crate::rules;
use crate::settings::Setting;
use crate::url_model::{dir_listing_url, url_filename};
use crate::verifier::SignedData;

/// How a companion was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    SignatureRule,
    DigestRule,
    AutodetectSignature,
    AutodetectDigest,
    /// Digest file plus a signature of that digest file.
    AutodetectSignedDigest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Download started by vd itself.
    Ignored,
    NoCompanion,
    Attached(Strategy),
}

/// What a companion download is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompanionKind {
    Digest,
    Signature(SignedData),
}

impl fmt::Display for CompanionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompanionKind::Digest => f.write_str("digest"),
            CompanionKind::Signature(SignedData::Data) => f.write_str("signature"),
            CompanionKind::Signature(SignedData::Digest) => f.write_str("digest signature"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Lookup {
    Signature,
    Digest,
}

impl Controller {
    /// Registers `download` and looks for its companions.
    pub async fn handle_download_created(
        &self,
        download: &DownloadDescriptor,
    ) -> Result<DiscoveryOutcome> {
        if !self.register_download(download).await {
            return Ok(DiscoveryOutcome::Ignored);
        }
        self.discover(download).await
    }

    /// Creates the record and menu entries for `download`. Returns false when
    /// the download was started by vd and is not tracked.
    pub async fn register_download(&self, download: &DownloadDescriptor) -> bool {
        if self.should_be_ignored(download) {
            tracing::debug!("ignoring own download {} ({})", download.id, download.url);
            return false;
        }
        let mut registry = self.shared.registry.lock().await;
        let surface = &self.collab().menus;
        if registry.is_empty() {
            for item in menus::parent_items() {
                surface.create(&item);
            }
        }
        for item in menus::child_items(download.id, &download.filename) {
            surface.create(&item);
        }
        registry.create_entry(download);
        tracing::debug!("tracking download {} ({})", download.id, download.url);
        true
    }

    /// Looks up companions for an already registered download. On error the
    /// record is dropped and its companion downloads cleaned up.
    pub async fn discover(&self, download: &DownloadDescriptor) -> Result<DiscoveryOutcome> {
        match self.locate_companions(download).await {
            Ok(DiscoveryOutcome::Attached(strategy)) => {
                self.dispatch_if_ready(download.id).await?;
                Ok(DiscoveryOutcome::Attached(strategy))
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.abandon(download.id, &e).await;
                Err(e)
            }
        }
    }

    async fn locate_companions(&self, download: &DownloadDescriptor) -> Result<DiscoveryOutcome> {
        let url = Url::parse(&download.url).map_err(|source| VdError::InvalidUrl {
            url: download.url.clone(),
            source,
        })?;

        if let Some(strategy) = self.try_rules(download.id, &url).await? {
            return Ok(DiscoveryOutcome::Attached(strategy));
        }
        if !self.settings().flag(Setting::UseAutodetect, true) {
            tracing::info!("No rule matched {} and autodetection is off", url);
            return Ok(DiscoveryOutcome::NoCompanion);
        }
        if let Some(strategy) = self.try_autodetect(download.id, &url).await? {
            return Ok(DiscoveryOutcome::Attached(strategy));
        }
        tracing::info!("No verification files detected for {}", url);
        Ok(DiscoveryOutcome::NoCompanion)
    }

    fn lookup_order(&self) -> &'static [Lookup] {
        let options = self.options();
        match (options.signatures_supported, options.policy.signature_first) {
            (false, _) => &[Lookup::Digest],
            (true, true) => &[Lookup::Signature, Lookup::Digest],
            (true, false) => &[Lookup::Digest, Lookup::Signature],
        }
    }

    async fn try_rules(&self, primary: DownloadId, url: &Url) -> Result<Option<Strategy>> {
        for lookup in self.lookup_order() {
            let (setting, kind, strategy) = match lookup {
                Lookup::Signature => (
                    Setting::SignatureRules,
                    CompanionKind::Signature(SignedData::Data),
                    Strategy::SignatureRule,
                ),
                Lookup::Digest => (
                    Setting::DigestRules,
                    CompanionKind::Digest,
                    Strategy::DigestRule,
                ),
            };
            if let Some(target) = self.rule_lookup(url, setting) {
                self.start_companion(primary, &target, kind).await?;
                return Ok(Some(strategy));
            }
        }
        Ok(None)
    }

    /// Rule list `setting` applied to `url`. Rules producing an invalid URL
    /// count as no match.
    fn rule_lookup(&self, url: &Url, setting: Setting) -> Option<Url> {
        let list = self.settings().text(setting);
        let href = rules::match_href(url.as_str(), &list)?;
        match Url::parse(&href) {
            Ok(target) => {
                tracing::debug!("{} rule maps {} to {}", setting, url, target);
                Some(target)
            }
            Err(e) => {
                tracing::error!("Rules list lookup error: {:?} is not a URL: {}", href, e);
                None
            }
        }
    }

    async fn try_autodetect(&self, primary: DownloadId, url: &Url) -> Result<Option<Strategy>> {
        let listing = dir_listing_url(url)?;
        let fetcher = &self.collab().fetcher;
        let html = bounded_fetch(
            &listing,
            self.options().fetch_timeout,
            fetcher.get_text(&listing),
        )
        .await?;
        let links = extract_same_origin_links(&html, &listing);
        let filename = url_filename(url);
        tracing::debug!("{} links in listing {}", links.len(), listing);

        for lookup in self.lookup_order() {
            match lookup {
                Lookup::Signature => {
                    if self
                        .detect_signature(primary, filename, &links, SignedData::Data)
                        .await?
                    {
                        return Ok(Some(Strategy::AutodetectSignature));
                    }
                }
                Lookup::Digest => {
                    let candidates =
                        digest_candidates(filename, &links, self.options().digest_profile);
                    let Some(digest_url) = select_first(candidates) else {
                        tracing::info!("No viable digest found for {}", url);
                        continue;
                    };
                    self.start_companion(primary, &digest_url, CompanionKind::Digest)
                        .await?;
                    if self.options().signatures_supported
                        && self
                            .detect_signature(
                                primary,
                                url_filename(&digest_url),
                                &links,
                                SignedData::Digest,
                            )
                            .await?
                    {
                        return Ok(Some(Strategy::AutodetectSignedDigest));
                    }
                    return Ok(Some(Strategy::AutodetectDigest));
                }
            }
        }
        Ok(None)
    }

    async fn detect_signature(
        &self,
        primary: DownloadId,
        filename: &str,
        links: &[Url],
        signed_data: SignedData,
    ) -> Result<bool> {
        match select_first(filter_signature_links(filename, links)) {
            Some(signature_url) => {
                self.start_companion(primary, &signature_url, CompanionKind::Signature(signed_data))
                    .await?;
                Ok(true)
            }
            None => {
                tracing::info!("No viable signature found for {}", filename);
                Ok(false)
            }
        }
    }

    /// Has the host download `url` and attaches it to the record of `primary`.
    pub(crate) async fn start_companion(
        &self,
        primary: DownloadId,
        url: &Url,
        kind: CompanionKind,
    ) -> Result<DownloadDescriptor> {
        let downloads = &self.collab().downloads;
        let start_failed = |e: VdError| match e {
            VdError::DownloadStart { .. } => e,
            other => VdError::DownloadStart {
                url: url.to_string(),
                reason: other.to_string(),
            },
        };
        let id = downloads.start_download(url).await.map_err(start_failed)?;
        let descriptor = downloads
            .search(id)
            .await
            .map_err(start_failed)?
            .ok_or_else(|| VdError::DownloadStart {
                url: url.to_string(),
                reason: format!("download {id} disappeared"),
            })?;

        let file = CompanionFile::from(&descriptor);
        let attached = {
            let mut registry = self.shared.registry.lock().await;
            match kind {
                CompanionKind::Digest => registry.attach_digest_file(primary, file),
                CompanionKind::Signature(signed_data) => {
                    registry.attach_signature_file(primary, file, signed_data)
                }
            }
        };
        let attached = match attached {
            Ok(attached) => attached,
            Err(e) => {
                self.cleanup(TransientDownload {
                    id,
                    state: SlotState::Downloading,
                })
                .await;
                return Err(e);
            }
        };
        tracing::info!("attached {} as {} of download {}", url, kind, primary);

        if let Some(replaced) = attached.replaced {
            self.cleanup(replaced).await;
        }
        if attached.early == Some(DownloadChange::Interrupted) {
            return Err(VdError::DownloadStart {
                url: url.to_string(),
                reason: "download interrupted".to_string(),
            });
        }
        Ok(descriptor)
    }
}
