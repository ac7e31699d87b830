//! Context-menu model.
//!
//! Four parent entries, one per way of designating a companion, each with one
//! child per tracked download. Child ids are `"{kind}-{download}"`.

use std::fmt;
use std::str::FromStr;

use crate::error::VdError;
use crate::host::DownloadId;
use crate::url_model::{file_dir, filename};
use crate::verifier::SignedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuKind {
    /// Selected text is the digest.
    SelectionDigest = 0,
    /// Link points to the digest file.
    LinkDigest = 1,
    /// Link points to a signature of the file.
    LinkSignature = 2,
    /// Link points to a signature of the digest file.
    LinkSignedDigest = 3,
}

impl MenuKind {
    pub const ALL: [MenuKind; 4] = [
        MenuKind::SelectionDigest,
        MenuKind::LinkDigest,
        MenuKind::LinkSignature,
        MenuKind::LinkSignedDigest,
    ];

    pub fn from_index(index: u8) -> Option<MenuKind> {
        MenuKind::ALL.into_iter().find(|k| *k as u8 == index)
    }

    pub fn context(self) -> MenuContext {
        match self {
            MenuKind::SelectionDigest => MenuContext::Selection,
            _ => MenuContext::Link,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MenuKind::SelectionDigest => "Use selection as digest for",
            MenuKind::LinkDigest => "Use link as digest file for",
            MenuKind::LinkSignature => "Use link as signature for",
            MenuKind::LinkSignedDigest => "Use link as signature of digest for",
        }
    }

    /// What a signature designated through this entry covers.
    pub fn signed_data(self) -> Option<SignedData> {
        match self {
            MenuKind::LinkSignature => Some(SignedData::Data),
            MenuKind::LinkSignedDigest => Some(SignedData::Digest),
            MenuKind::SelectionDigest | MenuKind::LinkDigest => None,
        }
    }

    /// Id of the parent entry.
    pub fn parent_id(self) -> String {
        (self as u8).to_string()
    }
}

/// Where in the page an entry is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuContext {
    Selection,
    Link,
}

/// Child entry id: which action, for which download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuId {
    pub kind: MenuKind,
    pub download: DownloadId,
}

impl MenuId {
    pub fn new(kind: MenuKind, download: DownloadId) -> Self {
        Self { kind, download }
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind as u8, self.download)
    }
}

impl FromStr for MenuId {
    type Err = VdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VdError::InvalidMenuId(s.to_string());
        let (kind, download) = s.split_once('-').ok_or_else(invalid)?;
        let kind = kind
            .parse::<u8>()
            .ok()
            .and_then(MenuKind::from_index)
            .ok_or_else(invalid)?;
        let download = download.parse::<DownloadId>().map_err(|_| invalid())?;
        Ok(MenuId { kind, download })
    }
}

/// An entry handed to the menu surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub parent: Option<String>,
    pub context: MenuContext,
    pub title: String,
}

/// The four parent entries.
pub fn parent_items() -> Vec<MenuItem> {
    MenuKind::ALL
        .into_iter()
        .map(|kind| MenuItem {
            id: kind.parent_id(),
            parent: None,
            context: kind.context(),
            title: kind.title().to_string(),
        })
        .collect()
}

/// Children for download `download` saved at `path`, titled `filename @ directory`.
pub fn child_items(download: DownloadId, path: &str) -> Vec<MenuItem> {
    let title = format!("{} @ {}", filename(path), file_dir(path));
    MenuKind::ALL
        .into_iter()
        .map(|kind| MenuItem {
            id: MenuId::new(kind, download).to_string(),
            parent: Some(kind.parent_id()),
            context: kind.context(),
            title: title.clone(),
        })
        .collect()
}

/// Ids of every child entry of `download`.
pub fn child_ids(download: DownloadId) -> Vec<String> {
    MenuKind::ALL
        .into_iter()
        .map(|kind| MenuId::new(kind, download).to_string())
        .collect()
}

/// A click on a child entry, as reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuClick {
    pub menu_item_id: String,
    pub selection_text: Option<String>,
    pub link_url: Option<String>,
}
