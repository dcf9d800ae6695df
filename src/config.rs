use crate::discovery::DEFAULT_MIN_AREA_RATIO;
use crate::error::{OverlayError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default OCR backend address
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4527";

/// Settings for the overlay engine and its collaborators
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Endpoint receiving raw image bytes
    pub server_url: Url,

    /// Minimum share of the viewport an image must cover to be picked
    pub min_area_ratio: f64,

    /// How often the live loop drains page events
    pub poll_interval: Duration,

    /// Timeout for image downloads and OCR requests
    pub request_timeout: Duration,

    /// Language tag set on rendered text blocks
    pub text_lang: String,

    /// Where the per-hostname auto mode preference is persisted
    pub preferences_path: PathBuf,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server URL is valid"),
            min_area_ratio: DEFAULT_MIN_AREA_RATIO,
            poll_interval: Duration::from_millis(250),
            request_timeout: Duration::from_secs(60),
            text_lang: "ja".to_string(),
            preferences_path: PathBuf::from("ocr-overlay-prefs.json"),
        }
    }
}

impl OverlayConfig {
    /// Create config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the OCR backend URL
    pub fn server_url(mut self, url: &str) -> Result<Self> {
        self.server_url = Url::parse(url).map_err(|e| OverlayError::InvalidConfig(format!("server URL {}: {}", url, e)))?;
        Ok(self)
    }

    /// Builder: set the minimum viewport coverage ratio
    pub fn min_area_ratio(mut self, ratio: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(OverlayError::InvalidConfig(format!("area ratio must be within 0..=1, got {}", ratio)));
        }
        self.min_area_ratio = ratio;
        Ok(self)
    }

    /// Builder: set the event polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder: set the network timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder: set the language tag of overlay text
    pub fn text_lang(mut self, lang: impl Into<String>) -> Self {
        self.text_lang = lang.into();
        self
    }

    /// Builder: set the preference file location
    pub fn preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OverlayConfig::default();
        assert_eq!(config.server_url.as_str(), "http://localhost:4527/");
        assert_eq!(config.min_area_ratio, 0.10);
        assert_eq!(config.text_lang, "ja");
    }

    #[test]
    fn test_builder() {
        let config = OverlayConfig::new()
            .server_url("http://10.0.0.2:9000/ocr")
            .unwrap()
            .min_area_ratio(0.25)
            .unwrap()
            .poll_interval(Duration::from_millis(100))
            .text_lang("zh");

        assert_eq!(config.server_url.path(), "/ocr");
        assert_eq!(config.min_area_ratio, 0.25);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.text_lang, "zh");
    }

    #[test]
    fn test_invalid_values() {
        assert!(OverlayConfig::new().server_url("not a url").is_err());
        assert!(OverlayConfig::new().min_area_ratio(1.5).is_err());
    }
}
