//! Fetch/overlay orchestration: image bytes in, OCR result out

use crate::config::OverlayConfig;
use crate::discovery::{fetch_url, image_source};
use crate::dom::Document;
use crate::error::{OverlayError, Result};
use crate::locator::{ElementPath, resolve};
use crate::ocr::{HttpImageFetcher, HttpOcrBackend, ImageFetcher, OcrBackend, OcrResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything needed to OCR one target, captured while the target still resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FetchJob {
    pub target: ElementPath,
    /// Source comparison key at request time
    pub source: Option<String>,
    pub image_url: String,
    /// URL of the page showing the image
    pub referer: String,
}

#[derive(Clone)]
pub struct Orchestrator {
    fetcher: Arc<dyn ImageFetcher>,
    backend: Arc<dyn OcrBackend>,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, backend: Arc<dyn OcrBackend>) -> Self {
        Self { fetcher, backend }
    }

    /// HTTP fetcher and backend built from config
    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpImageFetcher::from_config(config)?),
            Arc::new(HttpOcrBackend::from_config(config)?),
        ))
    }

    /// Resolve `target` and work out where its image comes from
    pub fn prepare(&self, doc: &Document, target: &ElementPath) -> Result<FetchJob> {
        let node = resolve(doc, target).ok_or_else(|| OverlayError::TargetLost(target.clone()))?;
        let image_url = fetch_url(doc, node).ok_or_else(|| OverlayError::TargetLost(target.clone()))?;

        Ok(FetchJob {
            target: target.clone(),
            source: image_source(doc, node),
            image_url,
            referer: doc.url().to_string(),
        })
    }

    /// Download the image and submit it to the backend, unless `token` fires first
    pub async fn run(self, job: FetchJob, token: CancellationToken) -> Result<OcrResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("OCR request for {} cancelled", job.target);
                Err(OverlayError::Cancelled(job.target.clone()))
            }
            result = self.recognize(&job) => result,
        }
    }

    async fn recognize(&self, job: &FetchJob) -> Result<OcrResult> {
        log::debug!("Fetching {} for {}", job.image_url, job.target);
        let bytes = self
            .fetcher
            .fetch(&job.image_url, &job.referer)
            .await
            .map_err(|e| match e {
                OverlayError::Transport(msg) => OverlayError::Transport(format!("Failed to get image bytes: {}", msg)),
                other => other,
            })?;

        log::debug!("Submitting {} bytes for {}", bytes.len(), job.target);
        self.backend.recognize(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, Viewport};
    use crate::ocr::OcrBlock;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        requests: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl ImageFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str, referer: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push((url.to_string(), referer.to_string()));
            if self.fail {
                Err(OverlayError::Transport("404 Not Found".into()))
            } else {
                Ok(vec![0xff, 0xd8, 0xff])
            }
        }
    }

    struct FixedBackend;

    #[async_trait]
    impl OcrBackend for FixedBackend {
        async fn recognize(&self, image: Vec<u8>) -> Result<OcrResult> {
            assert_eq!(image, vec![0xff, 0xd8, 0xff]);
            Ok(OcrResult::new(
                10.0,
                10.0,
                vec![OcrBlock::new([0.0, 0.0, 5.0, 5.0], vec!["字".into()], 2.0, false)],
            ))
        }
    }

    struct PendingBackend;

    #[async_trait]
    impl OcrBackend for PendingBackend {
        async fn recognize(&self, _image: Vec<u8>) -> Result<OcrResult> {
            std::future::pending().await
        }
    }

    fn page() -> Document {
        let body = ElementNode::new("body")
            .with_child(ElementNode::new("img").with_src("/pages/1.jpg"))
            .with_child(ElementNode::new("div").with_style("background-image: url(\"2.png\")"))
            .with_child(ElementNode::new("p"));
        Document::from_body(body, "https://example.com/read/1", Viewport::default())
    }

    #[test]
    fn test_prepare_resolves_urls_against_page() {
        let orchestrator = Orchestrator::new(Arc::new(RecordingFetcher::default()), Arc::new(FixedBackend));
        let doc = page();

        let job = orchestrator.prepare(&doc, &"/html/body/img[1]".into()).unwrap();
        assert_eq!(job.image_url, "https://example.com/pages/1.jpg");
        assert_eq!(job.source.as_deref(), Some("/pages/1.jpg"));
        assert_eq!(job.referer, "https://example.com/read/1");

        let job = orchestrator.prepare(&doc, &"/html/body/div[1]".into()).unwrap();
        assert_eq!(job.image_url, "https://example.com/read/2.png");
    }

    #[test]
    fn test_prepare_unresolvable_target() {
        let orchestrator = Orchestrator::new(Arc::new(RecordingFetcher::default()), Arc::new(FixedBackend));
        let doc = page();

        for path in ["/html/body/img[2]", "/html/body/p[1]"] {
            let err = orchestrator.prepare(&doc, &path.into()).unwrap_err();
            assert!(matches!(err, OverlayError::TargetLost(_)));
        }
    }

    #[tokio::test]
    async fn test_run_fetches_with_referer_then_recognizes() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let orchestrator = Orchestrator::new(fetcher.clone(), Arc::new(FixedBackend));
        let job = orchestrator.prepare(&page(), &"/html/body/img[1]".into()).unwrap();

        let result = orchestrator.run(job, CancellationToken::new()).await.unwrap();
        assert_eq!(result.blocks.len(), 1);

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[(
                "https://example.com/pages/1.jpg".to_string(),
                "https://example.com/read/1".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_transport() {
        let fetcher = Arc::new(RecordingFetcher {
            fail: true,
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(fetcher, Arc::new(FixedBackend));
        let job = orchestrator.prepare(&page(), &"/html/body/img[1]".into()).unwrap();

        match orchestrator.run(job, CancellationToken::new()).await {
            Err(OverlayError::Transport(msg)) => assert!(msg.starts_with("Failed to get image bytes")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_job_ends_early() {
        let orchestrator = Orchestrator::new(Arc::new(RecordingFetcher::default()), Arc::new(PendingBackend));
        let job = orchestrator.prepare(&page(), &"/html/body/img[1]".into()).unwrap();
        let token = CancellationToken::new();

        let handle = tokio::spawn(orchestrator.run(job, token.clone()));
        token.cancel();

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, Err(OverlayError::Cancelled(_))));
    }
}
