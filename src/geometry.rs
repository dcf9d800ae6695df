//! Rendered size and viewport visibility of elements

use crate::dom::{BoundingBox, Document, NodeId, Size, Viewport};
use thiserror::Error;

/// A CSS transform string that could not be read as a scale
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformParseError {
    #[error("unsupported transform function in `{0}`")]
    Unsupported(String),
    #[error("malformed matrix arguments in `{0}`")]
    Malformed(String),
}

/// Parse the horizontal scale component of a computed `transform` value
///
/// Computed styles serialize transforms as `matrix(a, b, c, d, e, f)` or
/// `matrix3d(...)`; the first argument is the x scale for unrotated transforms.
pub fn parse_transform_scale(transform: &str) -> Result<f64, TransformParseError> {
    let transform = transform.trim();
    if transform.is_empty() || transform.eq_ignore_ascii_case("none") {
        return Ok(1.0);
    }

    let (args, expected) = if let Some(rest) = transform.strip_prefix("matrix3d(") {
        (rest, 16)
    } else if let Some(rest) = transform.strip_prefix("matrix(") {
        (rest, 6)
    } else {
        return Err(TransformParseError::Unsupported(transform.to_string()));
    };

    let args = args
        .strip_suffix(')')
        .ok_or_else(|| TransformParseError::Malformed(transform.to_string()))?;

    let values = args
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| TransformParseError::Malformed(transform.to_string()))?;

    match values.first() {
        Some(scale) if values.len() == expected && scale.is_finite() => Ok(*scale),
        _ => Err(TransformParseError::Malformed(transform.to_string())),
    }
}

/// Scale for an optional transform, defaulting to 1 when absent or unreadable
pub fn transform_scale(transform: Option<&str>) -> f64 {
    match transform {
        None => 1.0,
        Some(value) => parse_transform_scale(value).unwrap_or_else(|err| {
            log::debug!("Ignoring transform: {}", err);
            1.0
        }),
    }
}

/// Laid-out size of an element multiplied by its transform scale
pub fn actual_size(doc: &Document, id: NodeId) -> Size {
    let Some(element) = doc.element(id) else {
        return Size::default();
    };
    let base = element
        .offset_size
        .or_else(|| element.bounding_box.map(|b| Size::new(b.width, b.height)))
        .unwrap_or_default();
    let scale = transform_scale(element.computed.transform.as_deref());
    Size::new(base.width * scale, base.height * scale)
}

/// Area of `rect` that falls inside the viewport; zero when fully off-screen
pub fn clipped_area(rect: &BoundingBox, viewport: Viewport) -> f64 {
    let visible_width = (rect.right().min(viewport.width) - rect.x.max(0.0)).max(0.0);
    let visible_height = (rect.bottom().min(viewport.height) - rect.y.max(0.0)).max(0.0);
    visible_width * visible_height
}

/// Viewport-clipped area of an element's bounding rectangle
pub fn visible_area(doc: &Document, id: NodeId, viewport: Viewport) -> f64 {
    doc.element(id)
        .and_then(|e| e.bounding_box)
        .map(|rect| clipped_area(&rect, viewport))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementNode;

    fn doc_with(img: ElementNode) -> (Document, NodeId) {
        let doc = Document::from_body(ElementNode::new("body").with_child(img), "https://example.com", Viewport::new(1000.0, 800.0));
        let id = doc.iter()[3];
        (doc, id)
    }

    #[test]
    fn test_parse_transform_scale() {
        assert_eq!(parse_transform_scale("none"), Ok(1.0));
        assert_eq!(parse_transform_scale("matrix(0.5, 0, 0, 0.5, 10, 20)"), Ok(0.5));
        assert_eq!(
            parse_transform_scale("matrix3d(2, 0, 0, 0, 0, 2, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1)"),
            Ok(2.0)
        );
    }

    #[test]
    fn test_parse_transform_scale_errors() {
        assert!(matches!(
            parse_transform_scale("rotate(45deg)"),
            Err(TransformParseError::Unsupported(_))
        ));
        assert!(matches!(
            parse_transform_scale("matrix(1, 0, 0"),
            Err(TransformParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_transform_scale("matrix(a, b, c, d, e, f)"),
            Err(TransformParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_transform_scale("matrix(1, 0, 0, 1)"),
            Err(TransformParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_transform_scale_falls_back() {
        assert_eq!(transform_scale(None), 1.0);
        assert_eq!(transform_scale(Some("garbage")), 1.0);
        assert_eq!(transform_scale(Some("matrix(1.5, 0, 0, 1.5, 0, 0)")), 1.5);
    }

    #[test]
    fn test_actual_size() {
        let (doc, id) = doc_with(
            ElementNode::new("img")
                .with_layout(0.0, 0.0, 400.0, 600.0)
                .with_transform("matrix(0.5, 0, 0, 0.5, 0, 0)"),
        );
        assert_eq!(actual_size(&doc, id), Size::new(200.0, 300.0));

        let (doc, id) = doc_with(ElementNode::new("img").with_layout(0.0, 0.0, 400.0, 600.0).with_transform("skew(oops"));
        assert_eq!(actual_size(&doc, id), Size::new(400.0, 600.0));
    }

    #[test]
    fn test_visible_area() {
        let viewport = Viewport::new(1000.0, 800.0);

        let (doc, id) = doc_with(ElementNode::new("img").with_bounding_box(100.0, 100.0, 200.0, 100.0));
        assert_eq!(visible_area(&doc, id, viewport), 20_000.0);

        // half scrolled out of the top
        let (doc, id) = doc_with(ElementNode::new("img").with_bounding_box(0.0, -50.0, 200.0, 100.0));
        assert_eq!(visible_area(&doc, id, viewport), 10_000.0);

        // overhangs the right and bottom edges
        let (doc, id) = doc_with(ElementNode::new("img").with_bounding_box(900.0, 700.0, 400.0, 400.0));
        assert_eq!(visible_area(&doc, id, viewport), 10_000.0);
    }

    #[test]
    fn test_visible_area_off_screen() {
        let viewport = Viewport::new(1000.0, 800.0);
        let (doc, id) = doc_with(ElementNode::new("img").with_bounding_box(0.0, 2000.0, 500.0, 500.0));
        assert_eq!(visible_area(&doc, id, viewport), 0.0);

        let (doc, id) = doc_with(ElementNode::new("img").with_bounding_box(-900.0, 0.0, 500.0, 500.0));
        assert_eq!(visible_area(&doc, id, viewport), 0.0);
    }
}
