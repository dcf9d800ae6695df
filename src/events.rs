//! Page events observed by the agent and consumed by the engine

use crate::locator::ElementPath;
use crate::overlay::ContainerKey;
use serde::{Deserialize, Serialize};

/// Something that happened on the host page that may move or replace images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// Window (`target: None`) or element load completion
    Load { target: Option<ElementPath> },
    /// Viewport (`target: None`) or element resize
    Resize { target: Option<ElementPath> },
    /// Window (`source: None`) or element scroll
    Scroll { source: Option<ElementPath> },
    /// Browser zoom or visual viewport scale change
    Zoom,
    /// Attribute or child-list change below the body
    Mutation { target: ElementPath, change: MutationKind },
    /// The page URL changed without necessarily reloading
    Navigation { url: String, kind: NavigationKind },
    /// The page itself took an overlay container out of the document
    OverlayRemoved { container: ContainerKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    Attribute {
        name: String,
    },
    ChildList {
        /// Whether any added subtree contains an image-bearing element
        #[serde(default)]
        added_images: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// popstate / pushState / replaceState
    History,
    /// URL change noticed while handling DOM mutations
    Inferred,
    /// Full document reload, the page agent had to be reinstalled
    Reload,
}

impl PageEvent {
    /// Attribute mutation helper
    pub fn attribute(target: impl Into<ElementPath>, name: impl Into<String>) -> Self {
        PageEvent::Mutation {
            target: target.into(),
            change: MutationKind::Attribute { name: name.into() },
        }
    }

    /// Child-list mutation helper
    pub fn child_list(target: impl Into<ElementPath>, added_images: bool) -> Self {
        PageEvent::Mutation {
            target: target.into(),
            change: MutationKind::ChildList { added_images },
        }
    }

    pub fn window_scroll() -> Self {
        PageEvent::Scroll { source: None }
    }

    pub fn viewport_resize() -> Self {
        PageEvent::Resize { target: None }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, PageEvent::Navigation { .. })
    }
}
