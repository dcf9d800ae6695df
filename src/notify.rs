//! User-facing notifications

use crate::error::OverlayError;
use crate::locator::ElementPath;
use std::fmt;
use std::sync::Mutex;

/// A short, non-blocking message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Image download or OCR request failed
    RequestFailed,
    /// OCR backend answered with something that is not an OCR result
    InvalidResponse,
    /// A manually triggered target no longer exists
    TargetNotFound(ElementPath),
    AutoModeChanged { enabled: bool },
}

impl Notification {
    /// Notification for a failure, if the user should see it
    pub fn for_error(err: &OverlayError) -> Option<Self> {
        match err {
            OverlayError::Transport(_) => Some(Notification::RequestFailed),
            OverlayError::Schema(_) => Some(Notification::InvalidResponse),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notification::AutoModeChanged { .. })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::RequestFailed => f.write_str("Error: Request failed"),
            Notification::InvalidResponse => f.write_str("Error: Invalid JSON response"),
            Notification::TargetNotFound(_) => f.write_str("Error: Image not found"),
            Notification::AutoModeChanged { enabled: true } => f.write_str("Auto Mode enabled"),
            Notification::AutoModeChanged { enabled: false } => f.write_str("Auto Mode disabled"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        if notification.is_error() {
            log::error!("{}", notification);
        } else {
            log::info!("{}", notification);
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.received.lock().map(|n| n.len()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) {
        if let Ok(mut received) = self.received.lock() {
            received.push(notification.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Notification::RequestFailed.to_string(), "Error: Request failed");
        assert_eq!(Notification::InvalidResponse.to_string(), "Error: Invalid JSON response");
        assert_eq!(
            Notification::AutoModeChanged { enabled: false }.to_string(),
            "Auto Mode disabled"
        );
    }

    #[test]
    fn test_only_backend_failures_are_shown() {
        assert_eq!(
            Notification::for_error(&OverlayError::Transport("refused".into())),
            Some(Notification::RequestFailed)
        );
        assert_eq!(
            Notification::for_error(&OverlayError::Schema("eof".into())),
            Some(Notification::InvalidResponse)
        );
        assert_eq!(Notification::for_error(&OverlayError::TargetLost("/html/body".into())), None);
        assert_eq!(Notification::for_error(&OverlayError::Cancelled("/html/body".into())), None);
    }

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(&Notification::AutoModeChanged { enabled: true });
        notifier.notify(&Notification::RequestFailed);

        assert_eq!(notifier.count(), 2);
        assert_eq!(notifier.notifications()[1], Notification::RequestFailed);
    }
}
