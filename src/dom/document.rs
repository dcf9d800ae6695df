use crate::dom::element::{BoundingBox, ElementNode};
use serde::{Deserialize, Serialize};

/// Index of a node inside a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Size of the layout viewport (window.innerWidth/innerHeight)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// One captured element and the position of its parent in [`PageSnapshot::nodes`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(default)]
    pub parent: Option<usize>,
    pub element: ElementNode,
}

/// Raw page capture as returned by the snapshot script
///
/// Elements are flattened in document order with parent indices, so arbitrarily
/// deep pages stay within the JSON parser's nesting limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub viewport: Viewport,
    /// The first node is `<html>`; every parent precedes its children
    pub nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone)]
struct NodeSlot {
    element: ElementNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed DOM tree with page-level state (URL, viewport)
///
/// Removed nodes leave a tombstone behind so that a [`NodeId`] is never reused
/// for a different element within one document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeSlot>>,
    root: NodeId,
    url: String,
    viewport: Viewport,
}

impl Document {
    /// Build a document from an element tree; a root that is not `<html>` is wrapped in one
    pub fn from_root(root: ElementNode, url: impl Into<String>, viewport: Viewport) -> Self {
        let root = if root.is_tag("html") {
            root
        } else if root.is_tag("body") {
            ElementNode::new("html").with_children(vec![ElementNode::new("head"), root])
        } else {
            ElementNode::new("html").with_children(vec![
                ElementNode::new("head"),
                ElementNode::new("body").with_child(root),
            ])
        };

        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            url: url.into(),
            viewport,
        };
        doc.root = doc.insert_tree(root, None);
        doc
    }

    /// Build a document whose `<body>` is the given element
    pub fn from_body(body: ElementNode, url: impl Into<String>, viewport: Viewport) -> Self {
        let body = if body.is_tag("body") {
            body
        } else {
            ElementNode::new("body").with_child(body)
        };
        Self::from_root(body, url, viewport)
    }

    /// Build a document from a page capture
    ///
    /// Nodes whose parent index is missing or does not precede them are dropped
    /// together with their descendants.
    pub fn from_snapshot(snapshot: PageSnapshot) -> Self {
        let mut doc = Self {
            nodes: Vec::with_capacity(snapshot.nodes.len()),
            root: NodeId(0),
            url: snapshot.url,
            viewport: snapshot.viewport,
        };

        let mut placed: Vec<Option<NodeId>> = Vec::with_capacity(snapshot.nodes.len());
        for node in snapshot.nodes {
            let parent = match node.parent {
                None if doc.nodes.is_empty() => None,
                Some(index) => match placed.get(index).copied().flatten() {
                    Some(parent) => Some(parent),
                    None => {
                        placed.push(None);
                        continue;
                    }
                },
                None => {
                    placed.push(None);
                    continue;
                }
            };
            placed.push(Some(doc.insert_tree(node.element, parent)));
        }

        if doc.nodes.is_empty() {
            doc.insert_tree(ElementNode::new("html"), None);
        }
        doc
    }

    /// Insert an element subtree in document order and link it under `parent`
    fn insert_tree(&mut self, element: ElementNode, parent: Option<NodeId>) -> NodeId {
        let first = NodeId(self.nodes.len());
        let mut pending = vec![(element, parent)];

        while let Some((mut element, parent)) = pending.pop() {
            let children = std::mem::take(&mut element.children);
            let id = NodeId(self.nodes.len());
            self.nodes.push(Some(NodeSlot {
                element,
                parent,
                children: Vec::with_capacity(children.len()),
            }));
            if let Some(slot) = parent.and_then(|p| self.slot_mut(p)) {
                slot.children.push(id);
            }
            pending.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }
        first
    }

    fn slot(&self, id: NodeId) -> Option<&NodeSlot> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// The `<html>` element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The first `<body>` child of the root
    pub fn body(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some_and(|e| e.is_tag("body")))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hostname of the page URL, if it has one
    pub fn hostname(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Whether the node is still attached to this document
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        self.slot(id).map(|slot| &slot.element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        self.slot_mut(id).map(|slot| &mut slot.element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// All attached nodes in document (pre-)order, starting at the root
    pub fn iter(&self) -> Vec<NodeId> {
        self.descendants_inclusive(self.root)
    }

    /// The node itself followed by its descendants in document order
    pub fn descendants_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// First element with the given `id` attribute in document order
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.iter()
            .into_iter()
            .find(|&node| self.element(node).and_then(|e| e.id()).is_some_and(|v| v == id))
    }

    /// Nearest positioned ancestor, falling back to the immediate parent
    pub fn offset_parent(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|&a| self.element(a).is_some_and(ElementNode::is_positioned))
            .or_else(|| self.parent(id))
    }

    /// Number of attached nodes
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set an attribute; returns false if the node is gone
    pub fn set_attribute(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.add_attribute(key, value);
                true
            }
            None => false,
        }
    }

    pub fn set_bounding_box(&mut self, id: NodeId, bbox: BoundingBox) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.bounding_box = Some(bbox);
                true
            }
            None => false,
        }
    }

    /// Append an element subtree as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: ElementNode) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        Some(self.insert_tree(child, Some(parent)))
    }

    /// Detach a node and its subtree; the root cannot be removed
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(slot) = self.slot_mut(parent) {
                slot.children.retain(|&c| c != id);
            }
        }
        for node in self.descendants_inclusive(id) {
            self.nodes[node.0] = None;
        }
        true
    }

    /// Move every bounding box as if the window scrolled by (dx, dy)
    pub fn scroll_window_by(&mut self, dx: f64, dy: f64) {
        for slot in self.nodes.iter_mut().flatten() {
            if let Some(bbox) = slot.element.bounding_box.as_mut() {
                *bbox = bbox.translated(-dx, -dy);
            }
        }
    }
}
