//! Wiring of discovery, auto selection, OCR jobs and overlay synchronization

use crate::auto::{AutoAction, AutoSelector, FetchTicket};
use crate::config::OverlayConfig;
use crate::dom::Document;
use crate::error::{OverlayError, Result};
use crate::events::PageEvent;
use crate::locator::ElementPath;
use crate::notify::{Notification, Notifier};
use crate::ocr::OcrResult;
use crate::orchestrator::{FetchJob, Orchestrator};
use crate::overlay::{OverlaySurface, OverlaySynchronizer, SessionId};
use crate::preferences::PreferenceStore;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Who asked for an OCR job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    /// Auto selection, valid while the selector is still on this generation
    Auto { generation: u64 },
    Manual,
}

/// A finished OCR job waiting to be applied to the page
#[derive(Debug)]
pub struct JobCompletion {
    pub origin: JobOrigin,
    pub job: FetchJob,
    pub outcome: Result<OcrResult>,
}

/// What one event batch did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Overlay sessions whose geometry was rewritten
    pub overlays_updated: usize,
    /// Whether an auto-selection pass ran
    pub auto_pass: bool,
    pub navigated: bool,
}

/// Overlay engine for one browser page
pub struct OverlayEngine<S: OverlaySurface> {
    config: OverlayConfig,
    surface: S,
    synchronizer: OverlaySynchronizer,
    auto: AutoSelector,
    orchestrator: Orchestrator,
    notifier: Arc<dyn Notifier>,
    preferences: Box<dyn PreferenceStore>,
    jobs: JoinSet<JobCompletion>,
    /// Parent of every manual job token, replaced on navigation
    page_token: CancellationToken,
}

impl<S: OverlaySurface> OverlayEngine<S> {
    pub fn new(
        config: OverlayConfig,
        surface: S,
        orchestrator: Orchestrator,
        notifier: Arc<dyn Notifier>,
        preferences: Box<dyn PreferenceStore>,
    ) -> Self {
        let synchronizer = OverlaySynchronizer::new(config.text_lang.clone());
        let auto = AutoSelector::new(config.min_area_ratio);
        Self {
            config,
            surface,
            synchronizer,
            auto,
            orchestrator,
            notifier,
            preferences,
            jobs: JoinSet::new(),
            page_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn synchronizer(&self) -> &OverlaySynchronizer {
        &self.synchronizer
    }

    pub fn auto(&self) -> &AutoSelector {
        &self.auto
    }

    /// Number of OCR jobs still running
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    /// Read the auto mode preference for the page's hostname and enter auto mode if set
    pub fn start(&mut self, doc: &Document) {
        let hostname = doc.hostname().unwrap_or_default();
        let enabled = match self.preferences.auto_mode(&hostname) {
            Ok(enabled) => enabled,
            Err(e) => {
                log::warn!("Failed to read auto mode preference for {:?}: {}", hostname, e);
                false
            }
        };
        log::debug!("Auto mode for {:?}: {}", hostname, enabled);

        let actions = self.auto.init(doc, enabled);
        self.execute(doc, actions);
    }

    /// Process one batch of page events against the snapshot taken after them
    ///
    /// A navigation anywhere in the batch resets the page. Otherwise every event
    /// is routed to the overlay sessions, and all auto-relevant events collapse
    /// into a single auto-selection pass.
    pub fn handle_events(&mut self, doc: &Document, events: &[PageEvent]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        if let Some(PageEvent::Navigation { url, kind }) = events.iter().find(|e| e.is_navigation()) {
            log::info!("Navigation ({:?}) to {}", kind, url);
            self.reset(doc);
            summary.navigated = true;
            return summary;
        }

        let mut pass_pending = false;
        for event in events {
            summary.overlays_updated += self.synchronizer.handle_event(doc, &mut self.surface, event);
            pass_pending |= self.auto.wants_pass(doc, event);
        }

        if pass_pending {
            let actions = self.auto.run_pass(doc);
            self.execute(doc, actions);
            summary.auto_pass = true;
        }
        summary
    }

    /// Flip auto mode for the page's hostname and persist the choice
    pub fn toggle_auto_mode(&mut self, doc: &Document) -> Result<bool> {
        let hostname = doc.hostname().unwrap_or_default();
        let enabled = !self.preferences.auto_mode(&hostname)?;
        self.preferences.set_auto_mode(&hostname, enabled)?;
        self.notifier.notify(&Notification::AutoModeChanged { enabled });

        if enabled {
            let actions = self.auto.init(doc, true);
            self.execute(doc, actions);
        } else {
            self.auto.disable();
        }
        Ok(enabled)
    }

    /// Manually request OCR for `target`
    ///
    /// A target that no longer resolves is reported to the user and otherwise ignored.
    pub fn trigger(&mut self, doc: &Document, target: &ElementPath) -> Result<()> {
        let job = match self.orchestrator.prepare(doc, target) {
            Ok(job) => job,
            Err(e) => {
                log::error!("Element not found for path {}: {}", target, e);
                self.notifier.notify(&Notification::TargetNotFound(target.clone()));
                return Err(e);
            }
        };
        let token = self.page_token.child_token();
        self.spawn(job, JobOrigin::Manual, token);
        Ok(())
    }

    /// Wait for the next OCR job to finish; `None` once nothing is in flight
    pub async fn next_completion(&mut self) -> Option<JobCompletion> {
        while let Some(joined) = self.jobs.join_next().await {
            match joined {
                Ok(completion) => return Some(completion),
                Err(e) => log::warn!("OCR task failed to complete: {}", e),
            }
        }
        None
    }

    /// Apply a finished job to the page, discarding it if the page moved on
    pub fn apply_completion(&mut self, doc: &Document, completion: JobCompletion) -> Option<SessionId> {
        let JobCompletion { origin, job, outcome } = completion;

        if let JobOrigin::Auto { generation } = origin {
            if !self.auto.is_current(generation) {
                log::debug!("Discarding superseded result for {}", job.target);
                return None;
            }
        }

        let result = match outcome {
            Ok(result) => result,
            Err(OverlayError::Cancelled(target)) => {
                log::debug!("Discarding cancelled request for {}", target);
                return None;
            }
            Err(e) => {
                log::error!("OCR request for {} failed: {}", job.target, e);
                if let Some(notification) = Notification::for_error(&e) {
                    self.notifier.notify(&notification);
                }
                return None;
            }
        };

        match self
            .synchronizer
            .attach(doc, &mut self.surface, &job.target, result, job.source.as_deref())
        {
            Ok(id) => Some(id),
            Err(e @ (OverlayError::TargetLost(_) | OverlayError::StaleTarget { .. })) => {
                log::debug!("Skipping overlay: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Failed to render overlay for {}: {}", job.target, e);
                None
            }
        }
    }

    /// Run every in-flight job to completion against `doc`
    pub async fn settle(&mut self, doc: &Document) -> Vec<SessionId> {
        let mut attached = Vec::new();
        while let Some(completion) = self.next_completion().await {
            attached.extend(self.apply_completion(doc, completion));
        }
        attached
    }

    /// Cancel all jobs, remove every overlay and leave auto mode
    pub fn shutdown(&mut self) {
        self.page_token.cancel();
        self.auto.disable();
        self.jobs.abort_all();
        if let Err(e) = self.synchronizer.detach_all(&mut self.surface) {
            log::warn!("Failed to remove overlays: {}", e);
        }
    }

    fn reset(&mut self, doc: &Document) {
        self.page_token.cancel();
        self.page_token = CancellationToken::new();
        let actions = self.auto.teardown();
        self.execute(doc, actions);
        self.start(doc);
    }

    fn execute(&mut self, doc: &Document, actions: Vec<AutoAction>) {
        for action in actions {
            match action {
                AutoAction::TearDown => {
                    if let Err(e) = self.synchronizer.detach_all(&mut self.surface) {
                        log::warn!("Failed to remove overlays: {}", e);
                    }
                }
                AutoAction::Fetch(ticket) => self.fetch(doc, ticket),
            }
        }
    }

    fn fetch(&mut self, doc: &Document, ticket: FetchTicket) {
        match self.orchestrator.prepare(doc, &ticket.target) {
            Ok(job) => self.spawn(job, JobOrigin::Auto { generation: ticket.generation }, ticket.token),
            Err(e) => log::debug!("Cannot fetch {}: {}", ticket.target, e),
        }
    }

    fn spawn(&mut self, job: FetchJob, origin: JobOrigin, token: CancellationToken) {
        log::info!("Requesting OCR for {} ({})", job.target, job.image_url);
        let orchestrator = self.orchestrator.clone();
        self.jobs.spawn(async move {
            let outcome = orchestrator.run(job.clone(), token).await;
            JobCompletion { origin, job, outcome }
        });
    }
}
