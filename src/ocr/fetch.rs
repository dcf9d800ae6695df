use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::REFERER;
use std::time::Duration;

/// Retrieves the raw bytes of an image URL on behalf of a page
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// `referer` is the URL of the page showing the image
    async fn fetch(&self, url: &str, referer: &str) -> Result<Vec<u8>>;
}

/// Fetches images over HTTP(S), decoding `data:` URLs locally
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        Self::new(config.request_timeout)
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str, referer: &str) -> Result<Vec<u8>> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let mut request = self.client.get(url);
        if !referer.is_empty() {
            request = request.header(REFERER, referer);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(OverlayError::Transport(format!(
                "Failed to get image bytes from {}: {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode the payload of a `data:[<mediatype>][;base64],<data>` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| OverlayError::Transport("not a data URL".to_string()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| OverlayError::Transport("data URL without payload".to_string()))?;

    if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|e| OverlayError::Transport(format!("invalid base64 in data URL: {}", e)))
    } else {
        Ok(urlencoding::decode_binary(data.as_bytes()).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_support::{closed_port_url, serve_once};
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_decode_base64_data_url() {
        let bytes = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_decode_percent_data_url() {
        let bytes = decode_data_url("data:image/svg+xml,%3Csvg%3E%3C/svg%3E").unwrap();
        assert_eq!(bytes, b"<svg></svg>");
    }

    #[test]
    fn test_decode_percent_data_url_keeps_raw_bytes() {
        let bytes = decode_data_url("data:application/octet-stream,%FF%00a%2").unwrap();
        assert_eq!(bytes, vec![0xFF, 0x00, b'a', b'%', b'2']);
    }

    #[test]
    fn test_decode_invalid_data_url() {
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
    }

    #[tokio::test]
    async fn test_fetch_sends_referer() {
        let (url, server) = serve_once(StatusCode::OK, vec![9, 8, 7]).await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5)).unwrap();

        let bytes = fetcher
            .fetch(&format!("{}page-001.jpg", url), "https://reader.example.com/ch/1")
            .await
            .unwrap();
        assert_eq!(bytes, vec![9, 8, 7]);

        let captured = server.await.unwrap();
        assert_eq!(captured.method, Method::GET);
        assert_eq!(captured.path, "/page-001.jpg");
        assert_eq!(captured.header("referer").as_deref(), Some("https://reader.example.com/ch/1"));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let (url, _server) = serve_once(StatusCode::NOT_FOUND, Vec::new()).await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&url, "").await.unwrap_err();
        assert!(matches!(err, OverlayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let url = closed_port_url().await;
        let fetcher = HttpImageFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(fetcher.fetch(&url, "").await.is_err());
    }
}
