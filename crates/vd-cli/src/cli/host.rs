//! Terminal stand-ins for the notification and menu surfaces.

use async_trait::async_trait;
use std::sync::Arc;
use vd_core::config::VdConfig;
use vd_core::host::{MenuSurface, Notifier};
use vd_core::menus::MenuItem;
use vd_core::verifier::{NativeMessagingProcess, VerifierBridge};

/// Prints notifications to stdout.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, message: &str) {
        println!("{title}\n{message}");
    }
}

/// There is no context menu on a terminal; entries are only logged.
pub struct LoggedMenus;

impl MenuSurface for LoggedMenus {
    fn create(&self, item: &MenuItem) {
        tracing::trace!("menu entry {} ({})", item.id, item.title);
    }

    fn remove(&self, id: &str) {
        tracing::trace!("menu entry {} removed", id);
    }
}

/// Verifier process configured in `cfg`.
pub fn verifier(cfg: &VdConfig) -> VerifierBridge {
    VerifierBridge::new(Arc::new(NativeMessagingProcess::new(
        cfg.verifier.program.clone(),
        cfg.verifier.args.clone(),
    )))
}
