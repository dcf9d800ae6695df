use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a DOM element node as captured from the page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ElementNode {
    /// Lowercase HTML tag name (e.g., "div", "img", "body")
    pub tag_name: String,

    /// Element attributes (e.g., id, src, style, data-original-src)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Child elements in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Subset of the computed style the overlay engine reads
    #[serde(default)]
    pub computed: ComputedStyle,

    /// Bounding client rect (viewport coordinates, transforms applied)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Laid-out box size before transforms (offsetWidth/offsetHeight)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_size: Option<Size>,

    /// Scroll and client extents, used to detect scrollable containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollMetrics>,
}

/// Computed style values relevant to image discovery and geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComputedStyle {
    /// `transform`, usually `none` or a `matrix(...)` string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,

    /// `background-image`, `none` or a `url(...)` value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    /// `position` (static, relative, absolute, fixed, sticky)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Width/height pair in CSS pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Scrollable extent versus visible client extent of an element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub client_width: f64,
    pub client_height: f64,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Builder method: set a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set the `id` attribute
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attribute("id", id)
    }

    /// Builder method: set the `src` attribute
    pub fn with_src(self, src: impl Into<String>) -> Self {
        self.with_attribute("src", src)
    }

    /// Builder method: set the inline `style` attribute
    pub fn with_style(self, style: impl Into<String>) -> Self {
        self.with_attribute("style", style)
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: append a child
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Builder method: set the untransformed layout size
    pub fn with_offset_size(mut self, width: f64, height: f64) -> Self {
        self.offset_size = Some(Size { width, height });
        self
    }

    /// Builder method: set bounding box and matching layout size in one go
    pub fn with_layout(self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.with_bounding_box(x, y, width, height)
            .with_offset_size(width, height)
    }

    /// Builder method: set computed transform
    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.computed.transform = Some(transform.into());
        self
    }

    /// Builder method: set computed background-image
    pub fn with_background_image(mut self, value: impl Into<String>) -> Self {
        self.computed.background_image = Some(value.into());
        self
    }

    /// Builder method: set computed position
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.computed.position = Some(position.into());
        self
    }

    /// Builder method: set scroll metrics
    pub fn with_scroll(mut self, scroll_width: f64, scroll_height: f64, client_width: f64, client_height: f64) -> Self {
        self.scroll = Some(ScrollMetrics {
            scroll_width,
            scroll_height,
            client_width,
            client_height,
        });
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Get the non-empty element ID
    pub fn id(&self) -> Option<&String> {
        self.attributes.get("id").filter(|id| !id.is_empty())
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Look up a property in the inline `style` attribute
    pub fn inline_style(&self, property: &str) -> Option<String> {
        let style = self.attributes.get("style")?;
        split_declarations(style).into_iter().find_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            if name.trim().eq_ignore_ascii_case(property) {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
    }

    /// Background image from the inline style, else from the computed style, ignoring `none`
    pub fn background_image(&self) -> Option<String> {
        self.inline_style("background-image")
            .filter(|value| !is_none_value(value))
            .or_else(|| {
                self.computed
                    .background_image
                    .clone()
                    .filter(|value| !is_none_value(value))
            })
    }

    /// Whether the element carries an image: an `<img>` or a background image
    pub fn is_image(&self) -> bool {
        self.is_tag("img") || self.background_image().is_some()
    }

    /// Whether the element's content overflows its client box
    pub fn is_overflowing(&self) -> bool {
        self.scroll.is_some_and(|s| {
            s.scroll_height > s.client_height || s.scroll_width > s.client_width
        })
    }

    /// Whether the computed position establishes a containing block for absolute children
    pub fn is_positioned(&self) -> bool {
        self.computed
            .position
            .as_deref()
            .is_some_and(|p| !p.trim().eq_ignore_ascii_case("static"))
    }
}

fn is_none_value(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none")
}

/// Split a style attribute on `;`, ignoring separators inside quotes or parentheses
fn split_declarations(style: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&style[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Calculate the area of the bounding box
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Translate the box by the given offset
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}
