use crate::dom::Document;
use crate::events::{MutationKind, PageEvent};
use crate::locator::{ElementPath, locate};
use indexmap::IndexSet;

/// Attributes whose changes can swap or move the primary image
pub const WATCHED_ATTRIBUTES: [&str; 2] = ["src", "style"];

/// Passive observers installed while auto mode is active
///
/// Scroll and load registrations are rebuilt from the document whenever the
/// page structure changes, so images and scroll containers added later are
/// picked up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObserverSet {
    /// `None` is the window
    scroll_sources: IndexSet<Option<ElementPath>>,
    image_loads: IndexSet<ElementPath>,
}

impl ObserverSet {
    /// Register the window plus every overflowing element and every image on the page
    pub fn scan(doc: &Document) -> Self {
        let mut set = ObserverSet::default();
        set.scroll_sources.insert(None);

        for id in doc.iter() {
            let Some(element) = doc.element(id) else {
                continue;
            };
            if !(element.is_overflowing() || element.is_tag("img")) {
                continue;
            }
            let Some(path) = locate(doc, id) else {
                continue;
            };
            if element.is_overflowing() {
                set.scroll_sources.insert(Some(path.clone()));
            }
            if element.is_tag("img") {
                set.image_loads.insert(path);
            }
        }
        set
    }

    /// Whether the event should trigger an auto-selection pass
    pub fn observes(&self, event: &PageEvent) -> bool {
        match event {
            PageEvent::Resize { target: None } | PageEvent::Zoom => true,
            PageEvent::Resize { target: Some(_) } => false,
            PageEvent::Load { target: None } => true,
            PageEvent::Load { target: Some(path) } => self.image_loads.contains(path),
            PageEvent::Scroll { source } => self.scroll_sources.contains(source),
            PageEvent::Mutation {
                change: MutationKind::Attribute { name },
                ..
            } => WATCHED_ATTRIBUTES.contains(&name.as_str()),
            PageEvent::Mutation {
                change: MutationKind::ChildList { added_images },
                ..
            } => *added_images,
            PageEvent::Navigation { .. } | PageEvent::OverlayRemoved { .. } => false,
        }
    }

    /// Whether the event can add scroll containers or images to observe
    pub fn needs_rescan(event: &PageEvent) -> bool {
        matches!(event, PageEvent::Mutation { .. })
    }

    pub fn scroll_sources(&self) -> impl Iterator<Item = &Option<ElementPath>> {
        self.scroll_sources.iter()
    }

    pub fn image_loads(&self) -> impl Iterator<Item = &ElementPath> {
        self.image_loads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementNode, Viewport};

    fn page() -> Document {
        let body = ElementNode::new("body")
            .with_child(
                ElementNode::new("div")
                    .with_id("pages")
                    .with_scroll(800.0, 9000.0, 800.0, 700.0)
                    .with_child(ElementNode::new("img").with_src("1.jpg"))
                    .with_child(ElementNode::new("img").with_src("2.jpg")),
            )
            .with_child(ElementNode::new("p"));
        Document::from_body(body, "https://example.com/read", Viewport::default())
    }

    #[test]
    fn test_scan_registers_window_scroll_containers_and_images() {
        let set = ObserverSet::scan(&page());

        let scrolls: Vec<_> = set.scroll_sources().cloned().collect();
        assert_eq!(scrolls, vec![None, Some(ElementPath::for_id("pages"))]);
        assert_eq!(set.image_loads().count(), 2);
    }

    #[test]
    fn test_observes_filters_events() {
        let set = ObserverSet::scan(&page());
        let img = ElementPath::from("//*[@id=\"pages\"]/img[1]");

        assert!(set.observes(&PageEvent::window_scroll()));
        assert!(set.observes(&PageEvent::Scroll {
            source: Some(ElementPath::for_id("pages"))
        }));
        assert!(!set.observes(&PageEvent::Scroll {
            source: Some(ElementPath::from("/html/body/p[1]"))
        }));
        assert!(set.observes(&PageEvent::viewport_resize()));
        assert!(set.observes(&PageEvent::Load { target: Some(img.clone()) }));
        assert!(set.observes(&PageEvent::attribute(img.clone(), "src")));
        assert!(set.observes(&PageEvent::attribute(img.clone(), "style")));
        assert!(!set.observes(&PageEvent::attribute(img, "class")));
        assert!(set.observes(&PageEvent::child_list(ElementPath::body(), true)));
        assert!(!set.observes(&PageEvent::child_list(ElementPath::body(), false)));
    }

    #[test]
    fn test_rescan_picks_up_new_images() {
        let mut doc = page();
        let before = ObserverSet::scan(&doc);
        let body = doc.body().unwrap();
        doc.append_child(body, ElementNode::new("img").with_src("3.jpg"));

        let after = ObserverSet::scan(&doc);
        assert_ne!(before, after);
        assert!(after.observes(&PageEvent::Load {
            target: Some(ElementPath::from("/html/body/img[1]"))
        }));
    }
}
