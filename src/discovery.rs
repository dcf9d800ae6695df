//! Finding image-bearing elements and picking the one the overlay follows

use crate::dom::{Document, NodeId, Size};
use crate::geometry::{actual_size, visible_area};
use crate::locator::{ElementPath, locate};
use serde::{Deserialize, Serialize};

/// Minimum share of the viewport an image must cover to be picked
pub const DEFAULT_MIN_AREA_RATIO: f64 = 0.10;

/// How candidates are scored when picking the primary image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Full rendered area, whether on screen or not
    RenderedArea,
    /// Area clipped to the viewport
    VisibleArea,
}

/// One discovered image, recomputed on every pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRegion {
    pub path: ElementPath,
    pub rendered: Size,
    pub visible_area: f64,
    pub source: Option<String>,
}

/// Every `<img>` and every element with a background image, in document order
pub fn all_candidates(doc: &Document) -> Vec<NodeId> {
    doc.iter()
        .into_iter()
        .filter(|&id| doc.element(id).is_some_and(|e| e.is_image()))
        .collect()
}

/// Score of one candidate under the given mode
pub fn score(doc: &Document, id: NodeId, mode: ScoreMode) -> f64 {
    match mode {
        ScoreMode::RenderedArea => actual_size(doc, id).area(),
        ScoreMode::VisibleArea => visible_area(doc, id, doc.viewport()),
    }
}

/// Describe every candidate on the page
pub fn discover(doc: &Document) -> Vec<ImageRegion> {
    all_candidates(doc)
        .into_iter()
        .filter_map(|id| {
            Some(ImageRegion {
                path: locate(doc, id)?,
                rendered: actual_size(doc, id),
                visible_area: visible_area(doc, id, doc.viewport()),
                source: image_source(doc, id),
            })
        })
        .collect()
}

/// Pick the highest-scoring candidate, accepted only if it covers `min_ratio` of the viewport
///
/// Ties go to the first candidate in document order.
pub fn select_primary(doc: &Document, mode: ScoreMode, min_ratio: f64) -> Option<ElementPath> {
    let viewport_area = doc.viewport().area();
    if viewport_area <= 0.0 {
        return None;
    }

    let mut best: Option<(NodeId, f64)> = None;
    for id in all_candidates(doc) {
        let area = score(doc, id, mode);
        if area > best.map_or(0.0, |(_, s)| s) {
            best = Some((id, area));
        }
    }

    let (id, area) = best?;
    if area / viewport_area >= min_ratio {
        locate(doc, id)
    } else {
        None
    }
}

/// Images large enough to offer a manual OCR trigger for (rendered, not visible, area)
pub fn manual_candidates(doc: &Document, min_ratio: f64) -> Vec<ElementPath> {
    let viewport_area = doc.viewport().area();
    if viewport_area <= 0.0 {
        return Vec::new();
    }
    all_candidates(doc)
        .into_iter()
        .filter(|&id| actual_size(doc, id).area() / viewport_area >= min_ratio)
        .filter_map(|id| locate(doc, id))
        .collect()
}

/// Identity of the image an element shows, used to detect source swaps
///
/// Prefers `data-original-src`, then `src` on images, then the background-image value.
pub fn image_source(doc: &Document, id: NodeId) -> Option<String> {
    let element = doc.element(id)?;
    let non_empty = |v: &&String| !v.trim().is_empty();

    element
        .get_attribute("data-original-src")
        .filter(non_empty)
        .or_else(|| {
            element
                .is_tag("img")
                .then(|| element.get_attribute("src").filter(non_empty))
                .flatten()
        })
        .cloned()
        .or_else(|| element.background_image())
}

/// Absolute URL to download the element's image from
pub fn fetch_url(doc: &Document, id: NodeId) -> Option<String> {
    let source = image_source(doc, id)?;
    let raw = css_url_value(&source).unwrap_or(source.as_str()).trim().to_string();
    if raw.is_empty() {
        return None;
    }

    match url::Url::parse(doc.url()) {
        Ok(base) => base.join(&raw).ok().map(String::from),
        Err(_) => url::Url::parse(&raw).ok().map(String::from),
    }
}

/// Extract the first `url(...)` argument of a CSS value, without quotes
pub fn css_url_value(value: &str) -> Option<&str> {
    let start = value.find("url(")? + "url(".len();
    let rest = value[start..].trim_start();

    match rest.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &rest[1..];
            inner.find(quote).map(|end| &inner[..end])
        }
        _ => rest.find(')').map(|end| rest[..end].trim_end()),
    }
}
