//! Stable, re-resolvable addresses for elements
//!
//! Paths use an XPath-compatible subset so the same string can be evaluated by
//! the page agent: `//*[@id="x"]`, `/html/body` and positional segments such as
//! `/html/body/div[2]/img[1]`.

use crate::dom::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

const ID_PREFIX: &str = "//*[@id=\"";
const ID_SUFFIX: &str = "\"]";
const ROOT_PATH: &str = "/html";
const BODY_PATH: &str = "/html/body";

/// Deterministic string address of an element within a document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementPath(String);

impl ElementPath {
    /// Path addressing the element with the given `id` attribute
    pub fn for_id(id: &str) -> Self {
        Self(format!("{}{}{}", ID_PREFIX, id, ID_SUFFIX))
    }

    /// Path of the document body
    pub fn body() -> Self {
        Self(BODY_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path is anchored on an `id` attribute
    pub fn is_id_anchored(&self) -> bool {
        self.0.starts_with(ID_PREFIX)
    }

    fn child(&self, tag: &str, index: usize) -> Self {
        Self(format!("{}/{}[{}]", self.0, tag, index))
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementPath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Compute the path of an element; `None` if the node is not attached
pub fn locate(doc: &Document, id: NodeId) -> Option<ElementPath> {
    let mut segments = Vec::new();
    let mut current = id;

    let anchor = loop {
        let element = doc.element(current)?;

        // An id containing a quote cannot be embedded in the id form
        if let Some(value) = element.id().filter(|v| !v.contains('"')) {
            break ElementPath::for_id(value);
        }
        if doc.body() == Some(current) {
            break ElementPath::body();
        }
        if current == doc.root() {
            break ElementPath(ROOT_PATH.to_string());
        }

        let parent = doc.parent(current)?;
        let index = 1 + doc
            .children(parent)
            .iter()
            .take_while(|&&sibling| sibling != current)
            .filter(|&&sibling| {
                doc.element(sibling)
                    .is_some_and(|s| s.tag_name == element.tag_name)
            })
            .count();
        segments.push((element.tag_name.as_str(), index));
        current = parent;
    };

    Some(
        segments
            .into_iter()
            .rev()
            .fold(anchor, |path, (tag, index)| path.child(tag, index)),
    )
}

/// Evaluate a path against the document; absence is not an error
pub fn resolve(doc: &Document, path: &ElementPath) -> Option<NodeId> {
    let path = path.as_str();

    let (anchor, rest) = if let Some(rest) = path.strip_prefix(ID_PREFIX) {
        let end = rest.find(ID_SUFFIX)?;
        (doc.find_by_id(&rest[..end])?, &rest[end + ID_SUFFIX.len()..])
    } else if let Some(rest) = path.strip_prefix(BODY_PATH).filter(|r| r.is_empty() || r.starts_with('/')) {
        (doc.body()?, rest)
    } else if let Some(rest) = path.strip_prefix(ROOT_PATH).filter(|r| r.is_empty() || r.starts_with('/')) {
        (doc.root(), rest)
    } else {
        return None;
    };

    if rest.is_empty() {
        return Some(anchor);
    }

    rest.strip_prefix('/')?
        .split('/')
        .try_fold(anchor, |current, segment| step(doc, current, segment))
}

/// Follow one `tag[n]` segment from `current`
fn step(doc: &Document, current: NodeId, segment: &str) -> Option<NodeId> {
    let (tag, index) = match segment.split_once('[') {
        Some((tag, rest)) => (tag, rest.strip_suffix(']')?.parse::<usize>().ok()?),
        None => (segment, 1),
    };
    if tag.is_empty() || index == 0 {
        return None;
    }

    doc.children(current)
        .iter()
        .copied()
        .filter(|&child| doc.element(child).is_some_and(|e| e.is_tag(tag)))
        .nth(index - 1)
}
