use crate::discovery::image_source;
use crate::dom::Document;
use crate::error::{OverlayError, Result};
use crate::events::PageEvent;
use crate::locator::{ElementPath, resolve};
use crate::ocr::OcrResult;
use crate::overlay::layout::{self, OverlayLayout};
use crate::overlay::session::{OverlaySession, SessionId, registrations_for};
use crate::overlay::surface::{BlockContent, BlockPatch, OverlayPatch, OverlaySurface};
use indexmap::IndexMap;

/// Creates overlay sessions and keeps their geometry in step with the page
pub struct OverlaySynchronizer {
    sessions: IndexMap<SessionId, OverlaySession>,
    next_id: u64,
    text_lang: String,
}

impl OverlaySynchronizer {
    pub fn new(text_lang: impl Into<String>) -> Self {
        Self {
            sessions: IndexMap::new(),
            next_id: 1,
            text_lang: text_lang.into(),
        }
    }

    /// Lay `result` over the element at `target`
    ///
    /// When `expected_source` is given, the target must still show that image;
    /// otherwise the result belongs to an earlier page state and nothing is written.
    pub fn attach(
        &mut self,
        doc: &Document,
        surface: &mut dyn OverlaySurface,
        target: &ElementPath,
        result: OcrResult,
        expected_source: Option<&str>,
    ) -> Result<SessionId> {
        let node = resolve(doc, target).ok_or_else(|| OverlayError::TargetLost(target.clone()))?;
        let current_source = image_source(doc, node);

        if let Some(expected) = expected_source {
            if current_source.as_deref() != Some(expected) {
                return Err(OverlayError::StaleTarget {
                    path: target.clone(),
                    expected: expected.to_string(),
                    found: current_source.unwrap_or_default(),
                });
            }
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;

        let mut session = OverlaySession::new(id, target.clone(), current_source, result);

        // A previous session on the same container hands its container over
        let replaced: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.container == session.container)
            .map(|s| s.id)
            .collect();
        for old in replaced {
            self.sessions.shift_remove(&old);
            log::debug!("{} replaced by {} on {}", old, id, session.container);
        }

        let layout = layout::compute(doc, node, &session.result);
        surface.apply(&self.full_patch(&session, &layout))?;

        session.registrations = registrations_for(doc, node, target);
        session.last_layout = Some(layout);
        log::info!(
            "Attached {} blocks to {} ({})",
            session.result.blocks.len(),
            target,
            id
        );
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// Recompute geometry for one session; returns whether anything was written
    ///
    /// If the page dropped the container or some of its blocks, the session is
    /// rebuilt from its OCR result instead.
    pub fn recompute(&mut self, doc: &Document, surface: &mut dyn OverlaySurface, id: SessionId) -> Result<bool> {
        let Some(session) = self.sessions.get(&id) else {
            return Ok(false);
        };
        let node = resolve(doc, &session.target).ok_or_else(|| OverlayError::TargetLost(session.target.clone()))?;

        let layout = layout::compute(doc, node, &session.result);
        if session.last_layout.as_ref() == Some(&layout) {
            return Ok(false);
        }

        let patch = OverlayPatch {
            container: session.container.clone(),
            anchor: session.target.clone(),
            layout: layout.container,
            reset: false,
            blocks: session
                .block_keys()
                .zip(&layout.blocks)
                .map(|(key, block)| BlockPatch {
                    key,
                    layout: *block,
                    content: None,
                })
                .collect(),
        };
        match surface.apply(&patch) {
            Ok(()) => {}
            Err(OverlayError::OverlayMissing(container)) => {
                log::debug!("Rebuilding {} after its blocks went missing", container);
                return self.rebuild(doc, surface, id);
            }
            Err(e) => return Err(e),
        }

        if let Some(session) = self.sessions.get_mut(&id) {
            session.last_layout = Some(layout);
        }
        Ok(true)
    }

    /// Write a session's container and blocks from scratch
    pub fn rebuild(&mut self, doc: &Document, surface: &mut dyn OverlaySurface, id: SessionId) -> Result<bool> {
        let Some(session) = self.sessions.get(&id) else {
            return Ok(false);
        };
        let node = resolve(doc, &session.target).ok_or_else(|| OverlayError::TargetLost(session.target.clone()))?;

        let layout = layout::compute(doc, node, &session.result);
        surface.apply(&self.full_patch(session, &layout))?;

        if let Some(session) = self.sessions.get_mut(&id) {
            session.last_layout = Some(layout);
        }
        Ok(true)
    }

    /// Recompute every session registered for `event`; returns how many were rewritten
    ///
    /// A removed container is rebuilt even when the layout did not change.
    pub fn handle_event(&mut self, doc: &Document, surface: &mut dyn OverlaySurface, event: &PageEvent) -> usize {
        let removed = match event {
            PageEvent::OverlayRemoved { container } => Some(container),
            _ => None,
        };
        let listening: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| match removed {
                Some(container) => s.container == *container,
                None => s.is_listening_to(event),
            })
            .map(|s| s.id)
            .collect();

        let mut written = 0;
        for id in listening {
            let outcome = match removed {
                Some(_) => self.rebuild(doc, surface, id),
                None => self.recompute(doc, surface, id),
            };
            match outcome {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(OverlayError::TargetLost(path)) => log::debug!("Target lost during update: {}", path),
                Err(e) => log::warn!("Failed to update overlay {}: {}", id, e),
            }
        }
        written
    }

    /// Remove a session's container and drop its registrations; unknown ids are a no-op
    pub fn detach(&mut self, surface: &mut dyn OverlaySurface, id: SessionId) -> Result<()> {
        let Some(mut session) = self.sessions.shift_remove(&id) else {
            return Ok(());
        };
        session.registrations.clear();
        log::debug!("Detaching {} from {}", id, session.target);
        surface.remove(&session.container)
    }

    /// Detach every session
    pub fn detach_all(&mut self, surface: &mut dyn OverlaySurface) -> Result<()> {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.detach(surface, id)?;
        }
        Ok(())
    }

    pub fn session(&self, id: SessionId) -> Option<&OverlaySession> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &OverlaySession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn full_patch(&self, session: &OverlaySession, layout: &OverlayLayout) -> OverlayPatch {
        OverlayPatch {
            container: session.container.clone(),
            anchor: session.target.clone(),
            layout: layout.container,
            reset: true,
            blocks: session
                .block_keys()
                .zip(session.result.blocks.iter().zip(&layout.blocks))
                .map(|(key, (block, block_layout))| BlockPatch {
                    key,
                    layout: *block_layout,
                    content: Some(BlockContent {
                        text: block.text(),
                        lang: self.text_lang.clone(),
                    }),
                })
                .collect(),
        }
    }
}
