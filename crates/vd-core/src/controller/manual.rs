//! Companions designated by the user through the context menu.

use url::Url;

use super::discovery::CompanionKind;
use super::Controller;
use crate::error::{Result, VdError};
use crate::host::DownloadId;
use crate::menus::{MenuClick, MenuId, MenuKind};
use crate::settings::Setting;

impl Controller {
    /// Handles a click on a child menu entry. Returns false when the selected
    /// text is not a digest; the user has been told so.
    pub async fn handle_menu_click(&self, click: &MenuClick) -> Result<bool> {
        let menu: MenuId = click.menu_item_id.parse()?;
        let missing = || VdError::MissingMenuTarget(click.menu_item_id.clone());
        match menu.kind {
            MenuKind::SelectionDigest => {
                let text = click.selection_text.as_deref().ok_or_else(missing)?;
                self.assign_digest(menu.download, text).await
            }
            kind => {
                let href = click.link_url.as_deref().ok_or_else(missing)?;
                let url = Url::parse(href).map_err(|source| VdError::InvalidUrl {
                    url: href.to_string(),
                    source,
                })?;
                let companion = match kind.signed_data() {
                    Some(signed_data) => CompanionKind::Signature(signed_data),
                    None => CompanionKind::Digest,
                };
                if let Err(e) = self.start_companion(menu.download, &url, companion).await {
                    tracing::error!("{}", e);
                    if e.notify_user() {
                        self.notify_if(Setting::NotifyOnError, "Error encountered", &e.to_string())
                            .await;
                    }
                    return Err(e);
                }
                self.dispatch_if_ready(menu.download).await?;
                Ok(true)
            }
        }
    }

    /// Uses `text` as the digest of download `primary` and dispatches the
    /// record if that makes it ready.
    pub async fn assign_digest(&self, primary: DownloadId, text: &str) -> Result<bool> {
        let assigned = self
            .shared
            .registry
            .lock()
            .await
            .assign_digest_hex(primary, text);
        let replaced = match assigned {
            Ok(replaced) => replaced,
            Err(VdError::InvalidDigest(hex)) => {
                let line = format!("{hex} is not a valid digest string");
                tracing::info!("{}", line);
                self.notify_if(Setting::NotifyOnError, "Error encountered", &line)
                    .await;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if let Some(replaced) = replaced {
            self.cleanup(replaced).await;
        }
        if let Err(e) = self.dispatch_if_ready(primary).await {
            tracing::debug!("dispatch after manual digest of {}: {}", primary, e);
        }
        Ok(true)
    }
}
