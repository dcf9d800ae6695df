//! Live Chrome/Chromium host over the DevTools protocol
//!
//! - [`BrowserSession`]: launch or connect, navigate, snapshot
//! - [`agent`]: the injected page script that reports page events and writes overlays
//! - [`TabSurface`] / [`TabNotifier`]: overlay writes and notifications routed into a tab
//! - [`LiveOverlay`]: the polling loop tying a tab to an [`OverlayEngine`](crate::engine::OverlayEngine)

pub mod agent;
pub mod config;
pub mod live;
pub mod session;
pub mod surface;

pub use config::{ConnectionOptions, LaunchOptions};
pub use live::LiveOverlay;
pub use session::BrowserSession;
pub use surface::{TabNotifier, TabSurface};
