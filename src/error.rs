use crate::locator::ElementPath;
use crate::overlay::ContainerKey;
use thiserror::Error;

/// Errors raised while discovering images, talking to the OCR backend or driving the browser
#[derive(Debug, Error)]
pub enum OverlayError {
    /// An ElementPath no longer resolves against the current document
    #[error("Target not found: {0}")]
    TargetLost(ElementPath),

    /// The target resolves, but to an image other than the one the OCR result was made for
    #[error("Stale target {path}: expected source {expected}, found {found}")]
    StaleTarget {
        path: ElementPath,
        expected: String,
        found: String,
    },

    /// Byte fetch or OCR request failed at the network layer
    #[error("Request failed: {0}")]
    Transport(String),

    /// OCR response was not valid JSON or did not match the expected shape
    #[error("Invalid JSON response: {0}")]
    Schema(String),

    /// A position-only update reached a container whose block elements are gone
    #[error("Overlay {0} must be rebuilt")]
    OverlayMissing(ContainerKey),

    /// The job was superseded by a newer target before it finished
    #[error("Request cancelled for {0}")]
    Cancelled(ElementPath),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Script evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to snapshot page: {0}")]
    SnapshotFailed(String),

    #[error("Preference store error: {0}")]
    Preferences(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OverlayError {
    /// Whether this failure should be surfaced to the user as a notification
    pub fn is_user_visible(&self) -> bool {
        matches!(self, OverlayError::Transport(_) | OverlayError::Schema(_))
    }

    /// Whether the failure only affects a single overlay pass
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OverlayError::TargetLost(_)
                | OverlayError::StaleTarget { .. }
                | OverlayError::OverlayMissing(_)
                | OverlayError::Transport(_)
                | OverlayError::Schema(_)
                | OverlayError::Cancelled(_)
        )
    }
}

impl From<reqwest::Error> for OverlayError {
    fn from(err: reqwest::Error) -> Self {
        OverlayError::Transport(err.to_string())
    }
}

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_visible_errors() {
        assert!(OverlayError::Transport("connection refused".into()).is_user_visible());
        assert!(OverlayError::Schema("missing field `blocks`".into()).is_user_visible());
        assert!(!OverlayError::TargetLost(ElementPath::from("/html/body/img[1]")).is_user_visible());
        assert!(!OverlayError::LaunchFailed("no chrome".into()).is_user_visible());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(OverlayError::Cancelled(ElementPath::from("/html/body")).is_recoverable());
        assert!(!OverlayError::ConnectionFailed("ws closed".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = OverlayError::Transport("timed out".into());
        assert_eq!(err.to_string(), "Request failed: timed out");

        let err = OverlayError::TargetLost(ElementPath::from("//*[@id=\"page\"]"));
        assert_eq!(err.to_string(), "Target not found: //*[@id=\"page\"]");
    }
}
