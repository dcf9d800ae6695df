//! # ocr-overlay
//!
//! Keeps OCR text overlays aligned with images on live web pages, driven over
//! the Chrome DevTools Protocol (CDP).
//!
//! ## Features
//!
//! - **Image discovery**: finds `<img>` elements and background images and picks the
//!   one covering most of the viewport
//! - **Overlay synchronization**: places one selectable text block per OCR block over
//!   the image and keeps it aligned through scrolling, resizing, zoom and DOM changes
//! - **Auto mode**: per-hostname, follows the primary image as it changes and
//!   re-runs OCR only when the target or its source actually changed
//! - **OCR backend client**: posts raw image bytes to an HTTP endpoint and parses
//!   the block layout it returns
//!
//! ## Running against a page
//!
//! ```bash
//! # Follow the page with auto mode (if enabled for the host)
//! cargo run -- watch https://example.com/chapter/1
//!
//! # Enable auto mode for a host, then watch headed
//! cargo run -- auto example.com --enable
//! cargo run -- --headed watch https://example.com/chapter/1
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use ocr_overlay::{BrowserSession, LaunchOptions, LiveOverlay, OverlayConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> ocr_overlay::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.navigate("https://example.com/chapter/1")?;
//!
//! let mut live = LiveOverlay::from_config(session.tab()?, OverlayConfig::default())?;
//! live.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The core runs on in-memory page snapshots, so it can be driven without a browser:
//!
//! ```rust
//! use ocr_overlay::dom::{Document, ElementNode, Viewport};
//! use ocr_overlay::discovery::{ScoreMode, select_primary};
//!
//! let body = ElementNode::new("body")
//!     .with_child(ElementNode::new("img").with_src("1.jpg").with_layout(0.0, 0.0, 800.0, 600.0));
//! let doc = Document::from_body(body, "https://example.com", Viewport::new(1280.0, 800.0));
//!
//! let target = select_primary(&doc, ScoreMode::VisibleArea, 0.10);
//! assert_eq!(target.unwrap().as_str(), "/html/body/img[1]");
//! ```
//!
//! ## Module Overview
//!
//! - [`geometry`], [`locator`], [`discovery`]: layout math, element paths, image ranking
//! - [`overlay`]: overlay sessions and their geometry
//! - [`auto`]: the auto-selection state machine
//! - [`orchestrator`], [`ocr`]: image download and OCR backend
//! - [`engine`]: everything above wired together for one page
//! - [`browser`]: the live CDP host
//! - [`error`]: error types and result aliases

pub mod auto;
pub mod browser;
pub mod config;
pub mod discovery;
pub mod dom;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod locator;
pub mod notify;
pub mod ocr;
pub mod orchestrator;
pub mod overlay;
pub mod preferences;

pub use auto::{AutoSelector, AutoState};
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions, LiveOverlay};
pub use config::OverlayConfig;
pub use dom::{Document, ElementNode, Viewport};
pub use engine::OverlayEngine;
pub use error::{OverlayError, Result};
pub use events::PageEvent;
pub use locator::ElementPath;
pub use notify::{LogNotifier, Notification, Notifier};
pub use ocr::{OcrBlock, OcrResult};
pub use orchestrator::Orchestrator;
pub use overlay::{MemorySurface, OverlaySurface, OverlaySynchronizer};
pub use preferences::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
