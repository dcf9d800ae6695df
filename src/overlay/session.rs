use crate::dom::{Document, NodeId};
use crate::events::{MutationKind, PageEvent};
use crate::locator::{ElementPath, locate};
use crate::ocr::OcrResult;
use crate::overlay::layout::OverlayLayout;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one attach call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Address of one rendered block: the session plus the block's index in the OCR result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    pub session: SessionId,
    pub index: usize,
}

/// DOM id of the container for a target, derived from its path
///
/// Repeated attaches for the same target share one container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerKey(String);

impl ContainerKey {
    pub fn for_target(target: &ElementPath) -> Self {
        Self(format!("ocr-overlay-{}", URL_SAFE_NO_PAD.encode(target.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A page signal that makes a session recompute its geometry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Registration {
    TargetLoad(ElementPath),
    TargetResize(ElementPath),
    /// Attribute changes on the target or one of its ancestors
    Attributes(ElementPath),
    /// Window scroll (`None`) or scroll of an overflowing ancestor
    Scroll(Option<ElementPath>),
    ViewportResize,
    WindowLoad,
    Zoom,
}

impl Registration {
    pub fn matches(&self, event: &PageEvent) -> bool {
        match (self, event) {
            (Registration::WindowLoad, PageEvent::Load { target: None }) => true,
            (Registration::TargetLoad(path), PageEvent::Load { target: Some(t) }) => path == t,
            (Registration::ViewportResize, PageEvent::Resize { target: None }) => true,
            (Registration::TargetResize(path), PageEvent::Resize { target: Some(t) }) => path == t,
            (Registration::Scroll(source), PageEvent::Scroll { source: s }) => source == s,
            (Registration::Zoom, PageEvent::Zoom) => true,
            (
                Registration::Attributes(path),
                PageEvent::Mutation {
                    target,
                    change: MutationKind::Attribute { .. },
                },
            ) => path == target,
            _ => false,
        }
    }
}

/// Everything a session listens to for the given target
pub fn registrations_for(doc: &Document, target: NodeId, path: &ElementPath) -> IndexSet<Registration> {
    let mut set = IndexSet::new();
    set.insert(Registration::TargetLoad(path.clone()));
    set.insert(Registration::TargetResize(path.clone()));
    set.insert(Registration::Attributes(path.clone()));
    set.insert(Registration::Scroll(None));
    set.insert(Registration::ViewportResize);
    set.insert(Registration::WindowLoad);
    set.insert(Registration::Zoom);

    for ancestor in doc.ancestors(target) {
        let Some(ancestor_path) = locate(doc, ancestor) else {
            continue;
        };
        if doc.element(ancestor).is_some_and(|e| e.is_overflowing()) {
            set.insert(Registration::Scroll(Some(ancestor_path.clone())));
        }
        set.insert(Registration::Attributes(ancestor_path));
    }
    set
}

/// Live association between a target element and its rendered OCR text layer
#[derive(Debug, Clone)]
pub struct OverlaySession {
    pub id: SessionId,
    pub target: ElementPath,
    /// Image source the OCR result was produced for
    pub source: Option<String>,
    pub container: ContainerKey,
    pub result: OcrResult,
    pub registrations: IndexSet<Registration>,
    pub last_layout: Option<OverlayLayout>,
}

impl OverlaySession {
    pub fn new(id: SessionId, target: ElementPath, source: Option<String>, result: OcrResult) -> Self {
        let container = ContainerKey::for_target(&target);
        Self {
            id,
            target,
            source,
            container,
            result,
            registrations: IndexSet::new(),
            last_layout: None,
        }
    }

    /// Keys of the rendered blocks, in OCR result order
    pub fn block_keys(&self) -> impl Iterator<Item = BlockKey> + '_ {
        (0..self.result.blocks.len()).map(move |index| BlockKey {
            session: self.id,
            index,
        })
    }

    pub fn is_listening_to(&self, event: &PageEvent) -> bool {
        self.registrations.iter().any(|r| r.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, Viewport};
    use crate::ocr::OcrBlock;

    fn reader_document() -> Document {
        let body = ElementNode::new("body").with_child(
            ElementNode::new("div")
                .with_id("viewer")
                .with_scroll(800.0, 6000.0, 800.0, 600.0)
                .with_child(ElementNode::new("img").with_src("1.jpg")),
        );
        Document::from_body(body, "https://example.com", Viewport::default())
    }

    #[test]
    fn test_container_key_is_deterministic() {
        let a = ContainerKey::for_target(&ElementPath::from("/html/body/img[1]"));
        let b = ContainerKey::for_target(&ElementPath::from("/html/body/img[1]"));
        let c = ContainerKey::for_target(&ElementPath::from("/html/body/img[2]"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("ocr-overlay-"));
        assert!(a.as_str().chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn test_registrations_include_scrollable_ancestors() {
        let doc = reader_document();
        let img = doc.iter()[4];
        let path = locate(&doc, img).unwrap();
        let set = registrations_for(&doc, img, &path);

        assert!(set.contains(&Registration::Scroll(Some(ElementPath::for_id("viewer")))));
        assert!(set.contains(&Registration::Attributes(ElementPath::for_id("viewer"))));
        assert!(set.contains(&Registration::Attributes(ElementPath::body())));
        assert!(!set.contains(&Registration::Scroll(Some(ElementPath::body()))));
    }

    #[test]
    fn test_registration_matching() {
        let path = ElementPath::from("/html/body/img[1]");
        assert!(Registration::TargetLoad(path.clone()).matches(&PageEvent::Load { target: Some(path.clone()) }));
        assert!(!Registration::TargetLoad(path.clone()).matches(&PageEvent::Load { target: None }));
        assert!(Registration::Scroll(None).matches(&PageEvent::window_scroll()));
        assert!(Registration::Attributes(path.clone()).matches(&PageEvent::attribute(path.clone(), "style")));
        assert!(!Registration::Attributes(path.clone()).matches(&PageEvent::child_list(path.clone(), true)));
        assert!(Registration::Zoom.matches(&PageEvent::Zoom));
    }

    #[test]
    fn test_block_keys_follow_result_order() {
        let result = OcrResult::new(
            10.0,
            10.0,
            vec![
                OcrBlock::new([0.0, 0.0, 1.0, 1.0], vec![], 1.0, false),
                OcrBlock::new([1.0, 1.0, 2.0, 2.0], vec![], 1.0, true),
            ],
        );
        let session = OverlaySession::new(SessionId(7), ElementPath::from("/html/body/img[1]"), None, result);
        let keys: Vec<_> = session.block_keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1], BlockKey { session: SessionId(7), index: 1 });
    }
}
