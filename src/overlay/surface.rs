use crate::error::{OverlayError, Result};
use crate::locator::ElementPath;
use crate::overlay::layout::{BlockLayout, ContainerLayout};
use crate::overlay::session::{BlockKey, ContainerKey};
use indexmap::IndexMap;
use serde::Serialize;

/// Text written into a block element when it is created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockContent {
    pub text: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockPatch {
    pub key: BlockKey,
    pub layout: BlockLayout,
    /// Present only when the block element has to be created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BlockContent>,
}

/// One batch of overlay DOM writes for a single container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayPatch {
    pub container: ContainerKey,
    /// The container is inserted right after this element
    pub anchor: ElementPath,
    pub layout: ContainerLayout,
    /// Drop existing block elements before applying `blocks`
    pub reset: bool,
    pub blocks: Vec<BlockPatch>,
}

/// Where overlay containers are rendered
pub trait OverlaySurface {
    /// Create or update the container and blocks named in the patch
    ///
    /// A patch without `reset` only repositions existing blocks. If the container or
    /// one of its blocks is missing, nothing is written and
    /// [`OverlayError::OverlayMissing`] is returned so the caller can send a full patch.
    fn apply(&mut self, patch: &OverlayPatch) -> Result<()>;

    /// Remove a container and its blocks; unknown containers are ignored
    fn remove(&mut self, container: &ContainerKey) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub layout: BlockLayout,
    pub text: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOverlay {
    pub anchor: ElementPath,
    pub layout: ContainerLayout,
    pub blocks: IndexMap<BlockKey, RenderedBlock>,
}

/// In-process surface keeping rendered overlays in maps
#[derive(Debug, Default)]
pub struct MemorySurface {
    containers: IndexMap<ContainerKey, RenderedOverlay>,
    writes: usize,
    removals: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self, key: &ContainerKey) -> Option<&RenderedOverlay> {
        self.containers.get(key)
    }

    pub fn containers(&self) -> impl Iterator<Item = (&ContainerKey, &RenderedOverlay)> {
        self.containers.iter()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Number of patches applied so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of containers removed so far
    pub fn removals(&self) -> usize {
        self.removals
    }
}

impl OverlaySurface for MemorySurface {
    fn apply(&mut self, patch: &OverlayPatch) -> Result<()> {
        if !patch.reset {
            let complete = self.containers.get(&patch.container).is_some_and(|overlay| {
                patch
                    .blocks
                    .iter()
                    .all(|block| block.content.is_some() || overlay.blocks.contains_key(&block.key))
            });
            if !complete {
                return Err(OverlayError::OverlayMissing(patch.container.clone()));
            }
        }
        self.writes += 1;
        let overlay = self
            .containers
            .entry(patch.container.clone())
            .or_insert_with(|| RenderedOverlay {
                anchor: patch.anchor.clone(),
                layout: patch.layout,
                blocks: IndexMap::new(),
            });

        overlay.anchor = patch.anchor.clone();
        overlay.layout = ContainerLayout {
            width: patch.layout.width.or(overlay.layout.width),
            height: patch.layout.height.or(overlay.layout.height),
            ..patch.layout
        };
        if patch.reset {
            overlay.blocks.clear();
        }

        for block in &patch.blocks {
            if let Some(content) = &block.content {
                overlay.blocks.insert(
                    block.key,
                    RenderedBlock {
                        layout: block.layout,
                        text: content.text.clone(),
                        lang: content.lang.clone(),
                    },
                );
            } else if let Some(rendered) = overlay.blocks.get_mut(&block.key) {
                rendered.layout = block.layout;
            }
        }
        Ok(())
    }

    fn remove(&mut self, container: &ContainerKey) -> Result<()> {
        if self.containers.shift_remove(container).is_some() {
            self.removals += 1;
        }
        Ok(())
    }
}
