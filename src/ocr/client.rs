use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::ocr::OcrResult;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use url::Url;

/// Service that turns raw image bytes into an [`OcrResult`]
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(&self, image: Vec<u8>) -> Result<OcrResult>;
}

/// OCR backend reached over HTTP: `POST` of the raw bytes, JSON reply
pub struct HttpOcrBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpOcrBackend {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        Self::new(config.server_url.clone(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn recognize(&self, image: Vec<u8>) -> Result<OcrResult> {
        log::debug!("Submitting {} bytes to {}", image.len(), self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
            .body(image)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OverlayError::Transport(format!("OCR backend returned {}: {}", status, text.trim())));
        }

        let body = response.bytes().await?;
        OcrResult::from_slice(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_support::{closed_port_url, serve_once};
    use axum::http::{Method, StatusCode};

    fn backend(url: &str) -> HttpOcrBackend {
        HttpOcrBackend::new(Url::parse(url).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_recognize_posts_raw_bytes() {
        let reply = br#"{"img_width": 800, "img_height": 1200, "blocks": [
            {"box": [10, 20, 110, 220], "lines": ["line"], "font_size": 24, "vertical": false}
        ]}"#;
        let (url, server) = serve_once(StatusCode::OK, reply.to_vec()).await;

        let result = backend(&url).recognize(vec![0xff, 0xd8, 0xff, 0xe0]).await.unwrap();
        assert_eq!(result.img_height, 1200.0);
        assert_eq!(result.blocks[0].text(), "line");

        let captured = server.await.unwrap();
        assert_eq!(captured.method, Method::POST);
        assert_eq!(captured.path, "/");
        assert_eq!(captured.header("content-type").as_deref(), Some("application/octet-stream"));
        assert_eq!(captured.body, vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[tokio::test]
    async fn test_recognize_error_status_is_transport_failure() {
        let (url, _server) = serve_once(StatusCode::BAD_REQUEST, b"Invalid image".to_vec()).await;
        let err = backend(&url).recognize(vec![1, 2, 3]).await.unwrap_err();
        match err {
            OverlayError::Transport(msg) => assert!(msg.contains("400")),
            other => panic!("Expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recognize_malformed_body_is_schema_failure() {
        let (url, _server) = serve_once(StatusCode::OK, b"not json".to_vec()).await;
        let err = backend(&url).recognize(vec![1]).await.unwrap_err();
        assert!(matches!(err, OverlayError::Schema(_)));
    }

    #[tokio::test]
    async fn test_recognize_unreachable_backend() {
        let url = closed_port_url().await;
        let err = backend(&url).recognize(vec![1]).await.unwrap_err();
        assert!(matches!(err, OverlayError::Transport(_)));
    }
}
