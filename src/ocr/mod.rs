//! OCR backend collaborators and the result model they produce
//!
//! - OcrResult / OcrBlock: the JSON document returned by the backend
//! - OcrBackend: submits raw image bytes and returns an OcrResult
//! - ImageFetcher: downloads the bytes of the image to recognize

pub mod client;
pub mod fetch;

#[cfg(test)]
mod test_support;

pub use client::{HttpOcrBackend, OcrBackend};
pub use fetch::{HttpImageFetcher, ImageFetcher};

use crate::error::{OverlayError, Result};
use serde::{Deserialize, Serialize};

/// One detected text block, in source-image pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    /// `[x1, y1, x2, y2]`
    #[serde(rename = "box")]
    pub bbox: [f64; 4],

    /// Text lines in reading order
    pub lines: Vec<String>,

    /// Font size at source-image scale
    pub font_size: f64,

    /// Whether the block is read top-to-bottom, right-to-left
    pub vertical: bool,
}

/// Structured OCR output for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub img_width: f64,
    pub img_height: f64,
    pub blocks: Vec<OcrBlock>,

    /// Backend version string, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl OcrBlock {
    pub fn new(bbox: [f64; 4], lines: Vec<String>, font_size: f64, vertical: bool) -> Self {
        Self {
            bbox,
            lines,
            font_size,
            vertical,
        }
    }

    pub fn x1(&self) -> f64 {
        self.bbox[0]
    }

    pub fn y1(&self) -> f64 {
        self.bbox[1]
    }

    pub fn width(&self) -> f64 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f64 {
        self.bbox[3] - self.bbox[1]
    }

    /// Lines joined with newlines, as rendered in the overlay
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl OcrResult {
    pub fn new(img_width: f64, img_height: f64, blocks: Vec<OcrBlock>) -> Self {
        Self {
            img_width,
            img_height,
            blocks,
            version: None,
        }
    }

    /// Parse and validate a backend response body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let result: OcrResult = serde_json::from_slice(body).map_err(|e| OverlayError::Schema(e.to_string()))?;
        result.validate()?;
        Ok(result)
    }

    /// Reject results the overlay cannot place
    pub fn validate(&self) -> Result<()> {
        if !(self.img_width.is_finite() && self.img_width > 0.0 && self.img_height.is_finite() && self.img_height > 0.0) {
            return Err(OverlayError::Schema(format!(
                "image dimensions must be positive, got {}x{}",
                self.img_width, self.img_height
            )));
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if block.bbox.iter().any(|v| !v.is_finite()) || block.width() < 0.0 || block.height() < 0.0 {
                return Err(OverlayError::Schema(format!("block {} has an invalid box {:?}", i, block.bbox)));
            }
            if !block.font_size.is_finite() || block.font_size < 0.0 {
                return Err(OverlayError::Schema(format!("block {} has an invalid font size", i)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_response() {
        let body = r#"{
            "version": "0.2.1",
            "img_width": 1000,
            "img_height": 1500,
            "blocks": [{
                "box": [100, 100, 300, 400],
                "vertical": true,
                "font_size": 32.5,
                "lines_coords": [[[0, 0], [1, 0], [1, 1], [0, 1]]],
                "lines": ["こんにちは", "世界"]
            }]
        }"#;
        let result = OcrResult::from_slice(body.as_bytes()).unwrap();

        assert_eq!(result.img_width, 1000.0);
        assert_eq!(result.version.as_deref(), Some("0.2.1"));
        assert_eq!(result.blocks.len(), 1);
        let block = &result.blocks[0];
        assert!(block.vertical);
        assert_eq!(block.width(), 200.0);
        assert_eq!(block.height(), 300.0);
        assert_eq!(block.text(), "こんにちは\n世界");
    }

    #[test]
    fn test_reject_non_json() {
        let err = OcrResult::from_slice(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, OverlayError::Schema(_)));
    }

    #[test]
    fn test_reject_missing_fields() {
        let err = OcrResult::from_slice(br#"{"img_width": 10, "img_height": 10}"#).unwrap_err();
        assert!(matches!(err, OverlayError::Schema(_)));
    }

    #[test]
    fn test_reject_bad_geometry() {
        let err = OcrResult::from_slice(br#"{"img_width": 0, "img_height": 10, "blocks": []}"#).unwrap_err();
        assert!(matches!(err, OverlayError::Schema(_)));

        let inverted = OcrResult::new(100.0, 100.0, vec![OcrBlock::new([50.0, 0.0, 10.0, 10.0], vec![], 12.0, false)]);
        assert!(inverted.validate().is_err());
    }
}
