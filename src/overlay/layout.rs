use crate::dom::{Document, NodeId};
use crate::geometry::actual_size;
use crate::ocr::{OcrBlock, OcrResult};
use serde::Serialize;

/// Absolute placement of the overlay container, relative to the target's offset parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContainerLayout {
    pub left: f64,
    pub top: f64,
    /// `None` leaves the previous width in place (target not laid out yet)
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Reading direction of a text block and the corner it is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFlow {
    /// Left-to-right lines, anchored bottom-left
    Horizontal,
    /// Top-to-bottom columns flowing right-to-left, anchored top-right
    VerticalRl,
}

/// Placement of one block outline, in percent of the container, plus its font size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockLayout {
    pub top: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
    /// Font size in CSS pixels at the current rendered scale
    pub font_size: f64,
    pub flow: TextFlow,
}

/// Full geometry of one overlay, recomputed on every layout change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayout {
    pub container: ContainerLayout,
    pub blocks: Vec<BlockLayout>,
}

/// Place a block relative to the image; right-anchored so vertical text hugs its right edge
pub fn block_layout(block: &OcrBlock, result: &OcrResult, scale_factor: f64) -> BlockLayout {
    let (w, h) = (result.img_width, result.img_height);
    BlockLayout {
        top: block.y1() * 100.0 / h,
        right: (w - block.x1() - block.width()) * 100.0 / w,
        width: block.width() * 100.0 / w,
        height: block.height() * 100.0 / h,
        font_size: block.font_size * scale_factor,
        flow: if block.vertical {
            TextFlow::VerticalRl
        } else {
            TextFlow::Horizontal
        },
    }
}

/// Container placement for the target's current rendered box
pub fn container_layout(doc: &Document, target: NodeId) -> ContainerLayout {
    let rect = doc
        .element(target)
        .and_then(|e| e.bounding_box)
        .unwrap_or_default();
    let parent_rect = doc
        .offset_parent(target)
        .and_then(|p| doc.element(p))
        .and_then(|e| e.bounding_box)
        .unwrap_or_default();
    let size = actual_size(doc, target);

    ContainerLayout {
        left: rect.x - parent_rect.x,
        top: rect.y - parent_rect.y,
        width: (size.width > 0.0).then_some(size.width),
        height: (size.height > 0.0).then_some(size.height),
    }
}

/// Compute container and block geometry for `result` laid over `target`
pub fn compute(doc: &Document, target: NodeId, result: &OcrResult) -> OverlayLayout {
    let rendered_width = actual_size(doc, target).width;
    let scale_factor = if result.img_width > 0.0 {
        rendered_width / result.img_width
    } else {
        1.0
    };

    OverlayLayout {
        container: container_layout(doc, target),
        blocks: result
            .blocks
            .iter()
            .map(|block| block_layout(block, result, scale_factor))
            .collect(),
    }
}
