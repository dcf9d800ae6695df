use crate::browser::agent::{self, ApplyOutcome};
use crate::error::{OverlayError, Result};
use crate::notify::{Notification, Notifier};
use crate::overlay::{ContainerKey, OverlayPatch, OverlaySurface};
use headless_chrome::Tab;
use std::sync::Arc;

/// Renders overlays into a live tab through the page agent
pub struct TabSurface {
    tab: Arc<Tab>,
}

impl TabSurface {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

impl OverlaySurface for TabSurface {
    fn apply(&mut self, patch: &OverlayPatch) -> Result<()> {
        match agent::apply(&self.tab, patch)? {
            ApplyOutcome::Applied => Ok(()),
            ApplyOutcome::AnchorMissing => Err(OverlayError::TargetLost(patch.anchor.clone())),
            ApplyOutcome::NeedsRebuild => Err(OverlayError::OverlayMissing(patch.container.clone())),
        }
    }

    fn remove(&mut self, container: &ContainerKey) -> Result<()> {
        if !agent::remove(&self.tab, container)? {
            log::debug!("Container {} was already gone", container);
        }
        Ok(())
    }
}

/// Logs notifications and shows them as a toast in the page
pub struct TabNotifier {
    tab: Arc<Tab>,
}

impl TabNotifier {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }
}

impl Notifier for TabNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.is_error() {
            log::error!("{}", notification);
        } else {
            log::info!("{}", notification);
        }
        if let Err(e) = agent::toast(&self.tab, &notification.to_string()) {
            log::debug!("Failed to show notification in page: {}", e);
        }
    }
}
