//! Page model used by the overlay engine
//!
//! This module holds an in-memory copy of the host page that every core
//! algorithm runs against:
//! - ElementNode: one captured element with the layout data we need
//! - Document: arena-indexed tree plus URL and viewport
//! - PageSnapshot: the raw capture produced by `snapshot_page.js`

pub mod document;
pub mod element;

pub use document::{Document, NodeId, PageSnapshot, SnapshotNode, Viewport};
pub use element::{BoundingBox, ComputedStyle, ElementNode, ScrollMetrics, Size};

use crate::error::{OverlayError, Result};
use headless_chrome::Tab;
use std::sync::Arc;

/// Capture the current page of a browser tab
pub fn capture(tab: &Arc<Tab>) -> Result<Document> {
    let js_code = include_str!("snapshot_page.js");

    let result = tab
        .evaluate(js_code, false)
        .map_err(|e| OverlayError::SnapshotFailed(format!("Failed to execute snapshot script: {}", e)))?;

    let json_value = result
        .value
        .ok_or_else(|| OverlayError::SnapshotFailed("No value returned from snapshot script".to_string()))?;

    // The script returns a JSON string to avoid CDP object preview truncation
    let json_str: String = serde_json::from_value(json_value)
        .map_err(|e| OverlayError::SnapshotFailed(format!("Failed to get JSON string: {}", e)))?;

    parse_snapshot(&json_str)
}

/// Parse the JSON produced by `snapshot_page.js` into a document
pub fn parse_snapshot(json: &str) -> Result<Document> {
    let snapshot: PageSnapshot = serde_json::from_str(json)
        .map_err(|e| OverlayError::SnapshotFailed(format!("Failed to parse snapshot JSON: {}", e)))?;

    Ok(Document::from_snapshot(snapshot))
}
